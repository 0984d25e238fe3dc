//! # Remote Repository
//!
//! The hosted version-control collaborator. It moves bytes and reports content hashes for
//! optimistic concurrency; it knows nothing about decision tables.
use crate::request::ValidationError;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

pub mod memory;

pub use memory::InMemoryRepository;

const GITHUB_HOST: &str = "github.com";

/// Failure reported by the remote repository.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Remote repository error: {0}")]
    Generic(String),
}

impl RemoteError {
    /// Maps an HTTP status reported by a hosted API.
    pub fn from_status(status: u16, message: &str) -> Self {
        let message = message.to_owned();
        match status {
            401 | 403 => RemoteError::Unauthorized(message),
            404 => RemoteError::NotFound(message),
            409 => RemoteError::Conflict(message),
            422 => RemoteError::AlreadyExists(message),
            _ => RemoteError::Generic(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str) -> Self {
        RepoRef {
            owner: owner.to_owned(),
            name: name.to_owned(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A file on a branch of a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    pub repo: RepoRef,
    pub path: String,
    pub branch: String,
}

impl FileLocation {
    pub fn new(repo: RepoRef, path: &str, branch: &str) -> Self {
        FileLocation {
            repo,
            path: path.trim_start_matches('/').to_owned(),
            branch: branch.to_owned(),
        }
    }

    /// Same file on another branch.
    pub fn on_branch(&self, branch: &str) -> Self {
        FileLocation {
            branch: branch.to_owned(),
            ..self.clone()
        }
    }

    /// Parses a `https://github.com/{owner}/{repo}/blob/{branch}/{path}` URL.
    pub fn parse_url(text: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidLocation {
            url: text.to_owned(),
            reason: reason.to_owned(),
        };
        let url = Url::parse(text.trim()).map_err(|e| invalid(&e.to_string()))?;
        if url.host_str() != Some(GITHUB_HOST) {
            return Err(invalid("expected a github.com URL"));
        }
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [owner, name, "blob", branch, path @ ..] if !path.is_empty() => Ok(FileLocation::new(
                RepoRef::new(owner, name),
                &path.join("/"),
                branch,
            )),
            _ => Err(invalid("expected /{owner}/{repo}/blob/{branch}/{path}")),
        }
    }
}

/// File content with the hash the remote needs to accept an update of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub sha: String,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRequest {
    pub message: String,
    pub author: Author,
    /// Hash of the file this commit replaces; a mismatch is a conflict
    pub expected_sha: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub commit_sha: String,
    /// Hash of the committed file content
    pub content_sha: String,
    pub branch: String,
    pub html_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchReceipt {
    pub branch_name: String,
    pub sha: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestRequest {
    pub title: String,
    pub body: String,
    /// Source branch
    pub head: String,
    /// Target branch
    pub base: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestReceipt {
    pub number: u64,
    pub url: String,
}

/// Hosted repository operations used by the sync workflows.
pub trait RemoteRepository {
    fn fetch_file(&self, location: &FileLocation) -> Result<RemoteFile, RemoteError>;

    /// Creates or replaces the file. A missing branch is created from the default branch first.
    fn commit_file(
        &mut self,
        location: &FileLocation,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<CommitReceipt, RemoteError>;

    fn create_branch(&mut self, repo: &RepoRef, branch: &str, from: &str) -> Result<BranchReceipt, RemoteError>;

    fn create_pull_request(
        &mut self,
        repo: &RepoRef,
        request: &PullRequestRequest,
    ) -> Result<PullRequestReceipt, RemoteError>;
}
