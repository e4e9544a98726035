//! Inline hashtag handling for post bodies.
//!
//! Extraction uses the whitespace-anchored rule: a `#word` only counts
//! as a tag when the `#` sits at the start of the text or right after
//! whitespace. Stripping is looser and removes `#word` anywhere, since
//! leftover hashtag noise is unwanted in prose regardless of position.
use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#(\w+)").expect("valid hashtag pattern"));
static ANY_HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("valid hashtag pattern"));

/// Hashtag tokens in order of appearance, duplicates kept.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Remove every `#word` occurrence from the text.
pub fn strip_hashtags(text: &str) -> String {
    ANY_HASHTAG.replace_all(text, "").into_owned()
}
