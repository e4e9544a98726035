//! Decides which fetched posts are eligible for syncing.
use anyhow::Result;
use std::collections::HashSet;

use crate::config::{Config, ConfigError};
use crate::github::GitRepository;
use crate::model::Post;
use crate::tags::extract_hashtags;

/// At most one of the two lists may be configured.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

impl FilterRules {
    pub fn new(
        include: Option<Vec<String>>,
        exclude: Option<Vec<String>>,
    ) -> Result<Self, ConfigError> {
        if include.is_some() && exclude.is_some() {
            return Err(ConfigError::ConflictingRules);
        }
        Ok(Self { include, exclude })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Self::new(cfg.include_tagged.clone(), cfg.exclude_tagged.clone())
    }
}

/// Explicit post tags plus hashtags recovered from the body,
/// deduplicated. Only used for filtering; the post itself is untouched.
pub fn tag_set(post: &Post) -> HashSet<String> {
    let mut tags: HashSet<String> = post.tags.iter().cloned().collect();
    tags.extend(extract_hashtags(&post.content));
    tags
}

/// Whether a post should be synced. Tag rules are checked first; the
/// remote existing-file lookup only runs for posts that pass them.
/// Lookup failures propagate.
pub async fn should_sync(
    post: &Post,
    rules: &FilterRules,
    repo: &dyn GitRepository,
    posts_dir: &str,
    filename: &str,
) -> Result<bool> {
    let tags = tag_set(post);

    if tags.is_empty() && rules.include.is_some() {
        return Ok(false);
    }
    if let Some(exclude) = &rules.exclude {
        if exclude.iter().any(|t| tags.contains(t)) {
            return Ok(false);
        }
    }
    if let Some(include) = &rules.include {
        if !include.iter().any(|t| tags.contains(t)) {
            return Ok(false);
        }
    }

    if repo.find_file(posts_dir, filename).await? {
        return Ok(false);
    }
    Ok(true)
}
