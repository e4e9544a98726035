//! Embedded-image localization: find remote images in rendered
//! Markdown, rewrite them to local paths, and download the originals
//! for inclusion in the commit.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::info;

use crate::github::CommitFile;

static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").expect("valid image pattern"));
static IMAGE_WITH_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!\[[^\]]*\]\()([^)?]+)\?[^)]*(\))").expect("valid image query pattern")
});
static LINKED_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(!\[[^\]]*\]\([^)]*\))\]\([^)]*\)").expect("valid linked image pattern")
});

/// One remote image discovered in a document: its bare filename (last
/// URL path segment) and the canonical URL with any query string
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub filename: String,
    pub url: String,
}

/// Scan Markdown image syntax and build the download manifest.
/// Deduplicated by filename; first occurrence wins the ordering.
pub fn extract_images(markdown: &str) -> Vec<ImageRef> {
    let mut seen: Vec<ImageRef> = Vec::new();
    for cap in IMAGE.captures_iter(markdown) {
        let url = cap[1].split('?').next().unwrap_or(&cap[1]).to_string();
        let filename = match url.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        if seen.iter().any(|r| r.filename == filename) {
            continue;
        }
        seen.push(ImageRef { filename, url });
    }
    seen
}

/// Rewrite a document so every manifest image points at
/// `/<images_dir>/<filename>`: query strings are dropped from image
/// references, each remote URL is replaced wherever it appears, and
/// the WordPress link-wrapping-an-image pattern collapses to the bare
/// image, since the source link is redundant once self-hosted.
pub fn localize_images(markdown: &str, images_dir: &str, images: &[ImageRef]) -> String {
    let mut text = IMAGE_WITH_QUERY
        .replace_all(markdown, "${1}${2}${3}")
        .into_owned();
    for image in images {
        let local = format!("/{images_dir}/{}", image.filename);
        text = text.replace(&image.url, &local);
    }
    LINKED_IMAGE.replace_all(&text, "${1}").into_owned()
}

/// Plain unauthenticated GET for image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestImageFetcher {
    http: Client,
}

#[async_trait]
impl ImageFetcher for ReqwestImageFetcher {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("problem downloading image {url}"))?;
        if !res.status().is_success() {
            return Err(anyhow!("problem downloading image {url}: {}", res.status()));
        }
        Ok(res.bytes().await.context("failed to read image body")?.to_vec())
    }
}

/// Fetch every manifest image and stage it under `images_dir` as
/// base64. One failed fetch aborts the run; a partial post with a
/// broken image reference must never be committed.
pub async fn download_images(
    fetcher: &dyn ImageFetcher,
    images_dir: &str,
    images: &[ImageRef],
) -> Result<Vec<CommitFile>> {
    let mut files = Vec::with_capacity(images.len());
    for image in images {
        let bytes = fetcher.download(&image.url).await?;
        info!(url = %image.url, size = bytes.len(), "downloaded image");
        files.push(CommitFile {
            path: format!("{images_dir}/{}", image.filename),
            content_b64: BASE64.encode(&bytes),
        });
    }
    Ok(files)
}
