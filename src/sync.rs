//! End-to-end orchestration: fetch → filter → render → localize
//! images → commit → delete source posts → report.
use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashSet;
use tracing::{info, instrument};

use crate::config::Config;
use crate::filename::derive_filename;
use crate::filter::{self, FilterRules};
use crate::github::{self, CommitFile, GitRepository};
use crate::images::{self, ImageFetcher};
use crate::render;
use crate::wordpress::BlogSource;

const COMMIT_MESSAGE: &str = "New WP sync'd post";

/// Normal terminal outcomes of one run. An empty fetch and an
/// everything-filtered batch are results, not errors; only
/// configuration and upstream failures travel the error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The blog returned zero posts.
    NothingNew,
    /// Posts were fetched but none survived filtering.
    NothingToPost,
    Synced {
        post_ids: Vec<u64>,
        report: Vec<String>,
    },
}

/// Drive one full sync. Strictly sequential: every remote call blocks
/// the next step, and the first failure aborts the run. Re-running is
/// safe because synced posts are skipped by the existing-file check.
#[instrument(skip_all)]
pub async fn run(
    cfg: &Config,
    blog: &dyn BlogSource,
    repo: &dyn GitRepository,
    fetcher: &dyn ImageFetcher,
) -> Result<SyncOutcome> {
    let rules = FilterRules::from_config(cfg)?;

    let posts = blog.list_posts().await?;
    if posts.is_empty() {
        return Ok(SyncOutcome::NothingNew);
    }

    let mut files: Vec<CommitFile> = Vec::new();
    let mut staged_images: HashSet<String> = HashSet::new();
    let mut post_ids: Vec<u64> = Vec::new();

    for post in &posts {
        let filename = derive_filename(post, cfg.date_prefix_untitled);
        if !filter::should_sync(post, &rules, repo, &cfg.posts_dir, &filename).await? {
            info!(id = post.id, "skipping post");
            continue;
        }

        let mut document = render::render(post, &cfg.template)?;
        let manifest = images::extract_images(&document);
        if !manifest.is_empty() {
            let images_dir = cfg.images_dir.as_deref().ok_or_else(|| {
                anyhow!(
                    "post {} embeds images but IMAGES_DIR is not configured",
                    post.id
                )
            })?;
            document = images::localize_images(&document, images_dir, &manifest);
            for file in images::download_images(fetcher, images_dir, &manifest).await? {
                // distinct image filenames only, across the whole batch
                if staged_images.insert(file.path.clone()) {
                    files.push(file);
                }
            }
        }

        files.push(CommitFile {
            path: format!("{}/{}", cfg.posts_dir, filename),
            content_b64: BASE64.encode(document.as_bytes()),
        });
        post_ids.push(post.id);
    }

    if post_ids.is_empty() {
        return Ok(SyncOutcome::NothingToPost);
    }

    let ids = post_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut report = Vec::new();
    report.push(
        github::push_files(
            repo,
            &cfg.repository,
            &cfg.branch,
            &files,
            COMMIT_MESSAGE,
            cfg.dry_run,
        )
        .await?,
    );

    if cfg.dry_run {
        report.push(format!("Would delete WordPress posts {ids}"));
    } else if cfg.keep_posts {
        info!("keeping source posts (DONT_DELETE set)");
    } else {
        for id in &post_ids {
            blog.delete_post(*id).await?;
        }
        report.push(format!("Deleted WordPress posts {ids}"));
    }

    report.push(format!(
        "Sync'd WordPress posts {ids} to GitHub {}",
        cfg.repository
    ));
    report.retain(|line| !line.is_empty());

    Ok(SyncOutcome::Synced { post_ids, report })
}
