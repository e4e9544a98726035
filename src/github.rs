//! GitHub collaborator: existing-file lookup plus the git-data
//! primitives used to land the whole sync batch as one commit.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

const GITHUB_API_BASE: &str = "https://api.github.com/";
const BLOB_MODE: &str = "100644";

/// One file queued for the sync commit. Content is base64 so binary
/// images and text Markdown ride the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    pub path: String,
    pub content_b64: String,
}

/// Entry in a git tree creation request.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
}

/// Content-addressed commit-graph primitives, plus the code-search
/// lookup the post filter uses. Production impl is [`GithubClient`];
/// tests substitute recording fakes.
#[async_trait]
pub trait GitRepository: Send + Sync {
    /// Exact-name existence check under a directory prefix.
    async fn find_file(&self, dir: &str, filename: &str) -> Result<bool>;
    async fn branch_head(&self, branch: &str) -> Result<String>;
    async fn commit_tree(&self, commit_sha: &str) -> Result<String>;
    async fn create_blob(&self, content_b64: &str) -> Result<String>;
    async fn create_tree(&self, base_tree: &str, entries: Vec<TreeEntry>) -> Result<String>;
    async fn create_commit(&self, message: &str, tree: &str, parent: &str) -> Result<String>;
    async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<()>;
}

/// Push a batch of files as a single commit on `branch`.
///
/// The ref only moves after every blob, the tree, and the commit have
/// been created; a failure at any step leaves the branch untouched
/// (already-created objects stay orphaned, which git tolerates).
pub async fn push_files(
    repo: &dyn GitRepository,
    repo_name: &str,
    branch: &str,
    files: &[CommitFile],
    message: &str,
    dry_run: bool,
) -> Result<String> {
    if dry_run {
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        return Ok(format!("Would add {} to {repo_name}", paths.join(", ")));
    }

    let head = repo.branch_head(branch).await?;
    let base_tree = repo.commit_tree(&head).await?;

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let sha = repo.create_blob(&file.content_b64).await?;
        debug!(path = %file.path, %sha, "created blob");
        entries.push(TreeEntry {
            path: file.path.clone(),
            mode: BLOB_MODE,
            kind: "blob",
            sha,
        });
    }

    let tree = repo.create_tree(&base_tree, entries).await?;
    let commit = repo.create_commit(message, &tree, &head).await?;
    repo.update_ref(branch, &commit).await?;
    info!(%commit, branch, "moved branch ref");

    Ok(format!(
        "Added {} file(s) to {repo_name} in commit {commit}",
        files.len()
    ))
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
    token: String,
    repository: String,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ShaResp {
    sha: String,
}

#[derive(Deserialize)]
struct RefResp {
    object: ShaResp,
}

#[derive(Deserialize)]
struct CommitResp {
    tree: ShaResp,
}

#[derive(Deserialize)]
struct SearchResp {
    total_count: u64,
}

impl GithubClient {
    pub fn new(token: String, repository: String) -> Self {
        let base_url = Url::parse(GITHUB_API_BASE).expect("valid default GitHub URL");
        Self::with_base_url(token, repository, base_url)
    }

    pub fn with_base_url(token: String, repository: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("wp-static-sync/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
            repository,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid GitHub endpoint {path}"))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let res = req
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .context("failed to reach GitHub")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("github error {status}: {body}"));
        }
        Ok(res)
    }
}

#[async_trait]
impl GitRepository for GithubClient {
    async fn find_file(&self, dir: &str, filename: &str) -> Result<bool> {
        let url = self.endpoint("search/code")?;
        let query = format!("filename:{filename} repo:{} path:{dir}", self.repository);
        let res = self.send(self.http.get(url).query(&[("q", query)])).await?;
        let found: SearchResp = res.json().await.context("invalid code-search response")?;
        Ok(found.total_count > 0)
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "repos/{}/git/ref/heads/{branch}",
            self.repository
        ))?;
        let res = self.send(self.http.get(url)).await?;
        let payload: RefResp = res.json().await.context("invalid ref response")?;
        Ok(payload.object.sha)
    }

    async fn commit_tree(&self, commit_sha: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "repos/{}/git/commits/{commit_sha}",
            self.repository
        ))?;
        let res = self.send(self.http.get(url)).await?;
        let payload: CommitResp = res.json().await.context("invalid commit response")?;
        Ok(payload.tree.sha)
    }

    async fn create_blob(&self, content_b64: &str) -> Result<String> {
        let url = self.endpoint(&format!("repos/{}/git/blobs", self.repository))?;
        let body = serde_json::json!({ "content": content_b64, "encoding": "base64" });
        let res = self.send(self.http.post(url).json(&body)).await?;
        let payload: ShaResp = res.json().await.context("invalid blob response")?;
        Ok(payload.sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: Vec<TreeEntry>) -> Result<String> {
        let url = self.endpoint(&format!("repos/{}/git/trees", self.repository))?;
        let body = serde_json::json!({ "base_tree": base_tree, "tree": entries });
        let res = self.send(self.http.post(url).json(&body)).await?;
        let payload: ShaResp = res.json().await.context("invalid tree response")?;
        Ok(payload.sha)
    }

    async fn create_commit(&self, message: &str, tree: &str, parent: &str) -> Result<String> {
        let url = self.endpoint(&format!("repos/{}/git/commits", self.repository))?;
        let body = serde_json::json!({ "message": message, "tree": tree, "parents": [parent] });
        let res = self.send(self.http.post(url).json(&body)).await?;
        let payload: ShaResp = res.json().await.context("invalid commit response")?;
        Ok(payload.sha)
    }

    async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<()> {
        let url = self.endpoint(&format!(
            "repos/{}/git/refs/heads/{branch}",
            self.repository
        ))?;
        let body = serde_json::json!({ "sha": commit_sha });
        self.send(self.http.patch(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// In-memory GitRepository for unit tests: answers `find_file`
    /// with a fixed value, records every primitive call, and can be
    /// told to fail at the tree-creation step.
    #[derive(Default)]
    pub struct StubRepo {
        pub file_found: bool,
        pub fail_on_create_tree: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubRepo {
        pub fn with_file_found(file_found: bool) -> Self {
            Self {
                file_found,
                ..Default::default()
            }
        }

        pub fn failing_at_tree() -> Self {
            Self {
                fail_on_create_tree: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl GitRepository for StubRepo {
        async fn find_file(&self, dir: &str, filename: &str) -> Result<bool> {
            self.record(format!("find_file {dir}/{filename}"));
            Ok(self.file_found)
        }

        async fn branch_head(&self, branch: &str) -> Result<String> {
            self.record(format!("branch_head {branch}"));
            Ok("head-sha".into())
        }

        async fn commit_tree(&self, commit_sha: &str) -> Result<String> {
            self.record(format!("commit_tree {commit_sha}"));
            Ok("base-tree-sha".into())
        }

        async fn create_blob(&self, _content_b64: &str) -> Result<String> {
            self.record("create_blob");
            Ok("blob-sha".into())
        }

        async fn create_tree(&self, base_tree: &str, entries: Vec<TreeEntry>) -> Result<String> {
            self.record(format!("create_tree {base_tree} ({} entries)", entries.len()));
            if self.fail_on_create_tree {
                return Err(anyhow!("simulated tree failure"));
            }
            Ok("tree-sha".into())
        }

        async fn create_commit(&self, _message: &str, tree: &str, parent: &str) -> Result<String> {
            self.record(format!("create_commit {tree} {parent}"));
            Ok("commit-sha".into())
        }

        async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<()> {
            self.record(format!("update_ref {branch} {commit_sha}"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubRepo;
    use super::*;

    fn files() -> Vec<CommitFile> {
        vec![
            CommitFile {
                path: "_posts/2019-11-08-one.md".into(),
                content_b64: "b25l".into(),
            },
            CommitFile {
                path: "img/pic.jpg".into(),
                content_b64: "cGlj".into(),
            },
        ]
    }

    #[tokio::test]
    async fn dry_run_makes_no_remote_calls() {
        let repo = StubRepo::default();
        let msg = push_files(&repo, "me/site", "master", &files(), "New WP sync'd post", true)
            .await
            .unwrap();
        assert_eq!(
            msg,
            "Would add _posts/2019-11-08-one.md, img/pic.jpg to me/site"
        );
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn pushes_blobs_tree_commit_then_ref() {
        let repo = StubRepo::default();
        push_files(&repo, "me/site", "master", &files(), "New WP sync'd post", false)
            .await
            .unwrap();
        assert_eq!(
            repo.calls(),
            vec![
                "branch_head master",
                "commit_tree head-sha",
                "create_blob",
                "create_blob",
                "create_tree base-tree-sha (2 entries)",
                "create_commit tree-sha head-sha",
                "update_ref master commit-sha",
            ]
        );
    }

    #[tokio::test]
    async fn tree_failure_leaves_ref_unmoved() {
        let repo = StubRepo::failing_at_tree();
        let err = push_files(&repo, "me/site", "master", &files(), "msg", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("simulated tree failure"));
        assert!(repo.calls().iter().all(|c| !c.starts_with("update_ref")));
    }

    #[test]
    fn tree_entries_serialize_with_git_field_names() {
        let entry = TreeEntry {
            path: "a.md".into(),
            mode: BLOB_MODE,
            kind: "blob",
            sha: "abc".into(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["mode"], "100644");
        assert_eq!(v["type"], "blob");
    }
}
