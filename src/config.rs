//! Environment-sourced configuration, built once at startup.
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {} environment variable(s)", .0.join(", "))]
    Missing(Vec<String>),
    #[error("INCLUDE_TAGGED and EXCLUDE_TAGGED are mutually exclusive; set at most one")]
    ConflictingRules,
    #[error("cannot read post template {path}: {source}")]
    Template {
        path: String,
        source: std::io::Error,
    },
}

/// Everything the sync run needs, validated before any network
/// activity. Components receive this by reference; nothing reads the
/// process environment after construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub wordpress_token: String,
    pub wordpress_endpoint: String,
    pub repository: String,
    pub branch: String,
    pub posts_dir: String,
    pub images_dir: Option<String>,
    pub template_path: PathBuf,
    pub template: String,
    pub include_tagged: Option<Vec<String>>,
    pub exclude_tagged: Option<Vec<String>>,
    pub dry_run: bool,
    pub keep_posts: bool,
    pub date_prefix_untitled: bool,
}

const REQUIRED: &[&str] = &[
    "GITHUB_TOKEN",
    "WORDPRESS_TOKEN",
    "WORDPRESS_ENDPOINT",
    "GITHUB_REPOSITORY",
    "POSTS_DIR",
    "POST_TEMPLATE",
];

impl Config {
    /// Build from the process environment. Missing required variables
    /// are collected and reported all at once.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests inject a map
    /// here instead of mutating the process environment).
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED
            .iter()
            .copied()
            .filter(|name| lookup(name).map_or(true, |v| v.trim().is_empty()))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let include_tagged = lookup("INCLUDE_TAGGED").map(|v| split_tags(&v));
        let exclude_tagged = lookup("EXCLUDE_TAGGED").map(|v| split_tags(&v));
        if include_tagged.is_some() && exclude_tagged.is_some() {
            return Err(ConfigError::ConflictingRules);
        }

        let template_path = PathBuf::from(lookup("POST_TEMPLATE").unwrap_or_default());
        let template = fs::read_to_string(&template_path).map_err(|source| {
            ConfigError::Template {
                path: template_path.display().to_string(),
                source,
            }
        })?;

        Ok(Config {
            github_token: lookup("GITHUB_TOKEN").unwrap_or_default(),
            wordpress_token: lookup("WORDPRESS_TOKEN").unwrap_or_default(),
            wordpress_endpoint: lookup("WORDPRESS_ENDPOINT")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            repository: lookup("GITHUB_REPOSITORY").unwrap_or_default(),
            branch: lookup("GITHUB_BRANCH").unwrap_or_else(|| "master".to_string()),
            posts_dir: lookup("POSTS_DIR")
                .unwrap_or_default()
                .trim_matches('/')
                .to_string(),
            images_dir: lookup("IMAGES_DIR").map(|v| v.trim_matches('/').to_string()),
            template_path,
            template,
            include_tagged,
            exclude_tagged,
            dry_run: flag(lookup("DRY_RUN")),
            keep_posts: flag(lookup("DONT_DELETE")),
            date_prefix_untitled: flag(lookup("DATE_PREFIX_UNTITLED")),
        })
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn flag(value: Option<String>) -> bool {
    value.map_or(false, |v| !v.trim().is_empty() && v != "0" && v.to_lowercase() != "false")
}
