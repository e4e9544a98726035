//! Turns a WordPress post into the final Markdown document: hashtag
//! cleanup, HTML→Markdown conversion, then user-template expansion.
use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;

use crate::model::Post;
use crate::tags::{extract_hashtags, strip_hashtags};

/// The fixed set of fields a post template may reference. Templates
/// get variable interpolation and truthy conditionals over these and
/// nothing else; no code execution.
#[derive(Debug, Serialize)]
struct PostContext {
    title: String,
    content: String,
    date: String,
    #[serde(rename = "type")]
    kind: String,
    format: String,
    tags: Vec<String>,
}

impl PostContext {
    fn from_post(post: &Post, markdown: String) -> Self {
        // Posts without explicit tags expose the ones recovered from
        // inline hashtags instead.
        let tags = if post.tags.is_empty() {
            extract_hashtags(&post.content)
        } else {
            post.tags.clone()
        };
        Self {
            title: post.title.clone(),
            content: markdown,
            date: post.date.format("%F %T").to_string(),
            kind: post.kind.clone(),
            format: post.format.clone(),
            tags,
        }
    }
}

/// Expand `template` against the post. Hashtags are metadata, not
/// prose, so they are stripped from the body before conversion. The
/// output is the verbatim expansion, trailing newline included.
pub fn render(post: &Post, template: &str) -> Result<String> {
    let body = strip_hashtags(&post.content);
    let markdown = html2md::parse_html(&body);
    let context = PostContext::from_post(post, markdown);

    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template("post", template)
        .context("invalid post template")?;
    let rendered = env
        .get_template("post")
        .expect("template registered above")
        .render(&context)
        .context("failed to render post template")?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn post(title: &str, tags: &[&str], body: &str) -> Post {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": { "rendered": title },
            "content": { "rendered": body },
            "date": "2019-11-08T16:33:20",
            "format": "aside",
            "type": "post",
            "tags": tags,
        }))
        .unwrap()
    }

    const TEMPLATE: &str = "---\n\
        title: {{ title }}\n\
        date: {{ date }}\n\
        {% if tags %}tags: [{{ tags | join(\", \") }}]\n{% endif %}\
        ---\n\n\
        {{ content }}\n";

    #[test]
    fn interpolates_metadata_and_converted_body() {
        let p = post("Cool Post", &["foo", "boo"], "<p>Body with <strong>bold</strong>.</p>");
        let doc = render(&p, TEMPLATE).unwrap();
        assert!(doc.starts_with("---\ntitle: Cool Post\ndate: 2019-11-08 16:33:20\n"));
        assert!(doc.contains("tags: [foo, boo]"));
        assert!(doc.contains("**bold**"));
        assert!(doc.ends_with('\n'));
    }

    #[test]
    fn empty_tags_fall_back_to_inline_hashtags() {
        let p = post("", &[], "Note body #micro #status");
        let doc = render(&p, TEMPLATE).unwrap();
        assert!(doc.contains("tags: [micro, status]"));
    }

    #[test]
    fn untruthy_conditional_blocks_are_omitted() {
        let p = post("No Tags", &[], "Plain body.");
        let doc = render(&p, TEMPLATE).unwrap();
        assert!(!doc.contains("tags:"));
    }

    #[test]
    fn hashtags_are_stripped_from_prose() {
        let p = post("T", &["kept"], "<p>Words #gone more words.</p>");
        let doc = render(&p, TEMPLATE).unwrap();
        assert!(!doc.contains("#gone"));
        assert!(doc.contains("Words"));
    }

    #[test]
    fn invalid_template_is_an_error() {
        let p = post("T", &[], "body");
        assert!(render(&p, "{% if %}broken").is_err());
    }

    #[test]
    fn expansion_is_verbatim() {
        let p = post("X", &[], "hello");
        let doc = render(&p, "{{ title }}!{{ content }}|").unwrap();
        assert_eq!(doc, "X!hello|");
    }
}
