use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// A WordPress post as returned by the REST `/posts` listing.
///
/// The wire format wraps title and content in `{"rendered": "..."}`
/// objects; those are flattened to plain strings here so the rest of
/// the pipeline works with named, typed fields. Absent tags become an
/// empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(deserialize_with = "rendered_text")]
    pub title: String,
    #[serde(deserialize_with = "rendered_text")]
    pub content: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub format: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

fn rendered_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Rendered::deserialize(deserializer)?.rendered)
}

impl Post {
    /// Seconds since midnight on the publish date. Used as the fallback
    /// slug for untitled posts.
    pub fn seconds_of_day(&self) -> i64 {
        self.date.and_utc().timestamp().rem_euclid(24 * 60 * 60)
    }
}
