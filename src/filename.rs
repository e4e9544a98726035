//! Deterministic Markdown filename derivation.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Post;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s./_]+").expect("valid separator pattern"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid disallowed pattern"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid spaces pattern"));

/// Filename for a post: `YYYY-MM-DD-<slug>.md` when titled, otherwise
/// the seconds-of-day number (date-prefixed only when
/// `date_prefix_untitled` is set). Pure function of title + date, so
/// repeated runs derive the same name; same-day duplicate titles
/// collide and are caught by the already-synced check instead.
pub fn derive_filename(post: &Post, date_prefix_untitled: bool) -> String {
    let date = post.date.format("%F");
    if post.title.is_empty() {
        let n = post.seconds_of_day();
        if date_prefix_untitled {
            format!("{date}-{n}.md")
        } else {
            format!("{n}.md")
        }
    } else {
        format!("{date}-{}.md", slugify(&post.title))
    }
}

fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let spaced = SEPARATORS.replace_all(&lowered, " ");
    let cleaned = DISALLOWED.replace_all(&spaced, "");
    let squeezed = SPACES.replace_all(&cleaned, " ");
    squeezed
        .trim()
        .replace(' ', "-")
        .trim_end_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, date: &str) -> Post {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": { "rendered": title },
            "content": { "rendered": "" },
            "date": date,
        }))
        .unwrap()
    }

    #[test]
    fn titled_post_gets_dated_slug() {
        let p = post("Foo Bar gOO DaR", "2019-11-08T16:33:20");
        assert_eq!(derive_filename(&p, false), "2019-11-08-foo-bar-goo-dar.md");
    }

    #[test]
    fn untitled_post_uses_seconds_of_day() {
        let p = post("", "2019-11-08T16:33:20");
        assert_eq!(derive_filename(&p, false), "59600.md");
    }

    #[test]
    fn untitled_post_can_carry_date_prefix() {
        let p = post("", "2019-11-08T16:33:20");
        assert_eq!(derive_filename(&p, true), "2019-11-08-59600.md");
    }

    #[test]
    fn punctuation_and_separators_are_normalized() {
        let p = post("Let's talk: files/paths_and.dots!", "2020-02-02T00:00:00");
        assert_eq!(
            derive_filename(&p, false),
            "2020-02-02-lets-talk-files-paths-and-dots.md"
        );
    }

    #[test]
    fn derivation_is_stable_across_calls() {
        let p = post("Repeat Me", "2020-01-01T10:00:00");
        assert_eq!(derive_filename(&p, false), derive_filename(&p, false));
    }

    #[test]
    fn trailing_hyphen_is_trimmed() {
        let p = post("Trailing dash - ", "2020-01-01T10:00:00");
        assert_eq!(derive_filename(&p, false), "2020-01-01-trailing-dash.md");
    }
}
