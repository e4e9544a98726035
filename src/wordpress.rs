//! WordPress collaborator: unpaged post listing and post deletion over
//! the WP REST API.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use tracing::info;

use crate::model::Post;

/// What the sync pipeline needs from the blog side. Production impl is
/// [`WordpressClient`]; tests substitute recording fakes.
#[async_trait]
pub trait BlogSource: Send + Sync {
    /// Single unpaged fetch of every available post. The source blog
    /// is assumed small; see the non-goals.
    async fn list_posts(&self) -> Result<Vec<Post>>;
    /// Delete one post by identifier.
    async fn delete_post(&self, id: u64) -> Result<()>;
}

#[derive(Clone)]
pub struct WordpressClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl fmt::Debug for WordpressClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordpressClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// WP error responses carry the reason in a `message` field.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn upstream_reason(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

impl WordpressClient {
    /// `endpoint` is the site's REST base, e.g.
    /// `https://public-api.wordpress.com/wp/v2/sites/example.wordpress.com`.
    pub fn new(endpoint: String, token: String) -> Self {
        let http = Client::builder()
            .user_agent("wp-static-sync/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl BlogSource for WordpressClient {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let uri = format!("{}/posts", self.endpoint);
        let res = self
            .http
            .get(&uri)
            .send()
            .await
            .map_err(|err| anyhow!("problem accessing {uri}: {err}"))?;
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("problem accessing {uri}: {}", upstream_reason(&body)));
        }
        let posts: Vec<Post> = res
            .json()
            .await
            .map_err(|err| anyhow!("problem accessing {uri}: {err}"))?;
        info!(count = posts.len(), "fetched WordPress posts");
        Ok(posts)
    }

    async fn delete_post(&self, id: u64) -> Result<()> {
        let uri = format!("{}/posts/{id}", self.endpoint);
        let res = self
            .http
            .delete(&uri)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|err| anyhow!("problem deleting post: {err}"))?;
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("problem deleting post: {}", upstream_reason(&body)));
        }
        info!(id, "deleted WordPress post");
        Ok(())
    }
}
