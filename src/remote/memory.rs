//! Deterministic in-process [`RemoteRepository`].
//!
//! File hashes are git blob hashes, so a `sha` obtained here has the same meaning as one reported
//! by a hosted API. Commit hashes are derived from the parent, message and tree content.

use crate::remote::BranchReceipt;
use crate::remote::CommitReceipt;
use crate::remote::CommitRequest;
use crate::remote::FileLocation;
use crate::remote::PullRequestReceipt;
use crate::remote::PullRequestRequest;
use crate::remote::RemoteError;
use crate::remote::RemoteFile;
use crate::remote::RemoteRepository;
use crate::remote::RepoRef;
use sha1::Digest;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::info;
use tracing::warn;

/// Git blob hash of `content`.
pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[derive(Clone, Debug, Default)]
struct Branch {
    head: String,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Clone, Debug)]
struct PullRequest {
    number: u64,
    head: String,
    base: String,
}

#[derive(Clone, Debug)]
struct Repository {
    default_branch: String,
    branches: HashMap<String, Branch>,
    pulls: Vec<PullRequest>,
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    repositories: HashMap<(String, String), Repository>,
    required_token: Option<String>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every request whose token differs from `token`.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_owned());
        self
    }

    /// Registers an empty repository with one root commit on `default_branch`.
    pub fn create_repository(&mut self, repo: &RepoRef, default_branch: &str) {
        let root = Branch {
            head: commit_sha("", "Initial commit", &BTreeMap::new()),
            files: BTreeMap::new(),
        };
        self.repositories.insert(
            key(repo),
            Repository {
                default_branch: default_branch.to_owned(),
                branches: HashMap::from([(default_branch.to_owned(), root)]),
                pulls: Vec::new(),
            },
        );
    }

    /// Writes a file directly, bypassing hash checks. Used to seed fixtures and simulate
    /// concurrent edits.
    pub fn put_file(&mut self, location: &FileLocation, content: &[u8]) -> Result<String, RemoteError> {
        let repository = self.repository_mut(&location.repo)?;
        let branch = repository
            .branches
            .get_mut(&location.branch)
            .ok_or_else(|| branch_not_found(&location.repo, &location.branch))?;
        branch.files.insert(location.path.to_owned(), content.to_vec());
        branch.head = commit_sha(&branch.head, "Seed", &branch.files);
        Ok(blob_sha(content))
    }

    /// Number of open pull requests in a repository.
    pub fn pull_request_count(&self, repo: &RepoRef) -> usize {
        self.repositories.get(&key(repo)).map(|repository| repository.pulls.len()).unwrap_or(0)
    }

    fn authorize(&self, repo: &RepoRef) -> Result<(), RemoteError> {
        match &self.required_token {
            Some(required) if repo.token.as_ref() != Some(required) => {
                warn!(repo = %repo.full_name(), "Rejected request with missing or wrong token");
                Err(RemoteError::Unauthorized(format!("Bad credentials for {}", repo.full_name())))
            }
            _ => Ok(()),
        }
    }

    fn repository(&self, repo: &RepoRef) -> Result<&Repository, RemoteError> {
        self.authorize(repo)?;
        self.repositories
            .get(&key(repo))
            .ok_or_else(|| RemoteError::NotFound(format!("Repository {}", repo.full_name())))
    }

    fn repository_mut(&mut self, repo: &RepoRef) -> Result<&mut Repository, RemoteError> {
        self.authorize(repo)?;
        self.repositories
            .get_mut(&key(repo))
            .ok_or_else(|| RemoteError::NotFound(format!("Repository {}", repo.full_name())))
    }
}

fn key(repo: &RepoRef) -> (String, String) {
    (repo.owner.to_owned(), repo.name.to_owned())
}

fn branch_not_found(repo: &RepoRef, branch: &str) -> RemoteError {
    RemoteError::NotFound(format!("Branch {} in {}", branch, repo.full_name()))
}

fn commit_sha(parent: &str, message: &str, files: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(parent.as_bytes());
    hasher.update(b"\n");
    hasher.update(message.as_bytes());
    for (path, content) in files {
        hasher.update(b"\n");
        hasher.update(path.as_bytes());
        hasher.update(blob_sha(content).as_bytes());
    }
    hex::encode(hasher.finalize())
}

impl RemoteRepository for InMemoryRepository {
    fn fetch_file(&self, location: &FileLocation) -> Result<RemoteFile, RemoteError> {
        info!(repo = %location.repo.full_name(), path = %location.path, branch = %location.branch, "Fetching file");
        let content = self
            .repository(&location.repo)?
            .branches
            .get(&location.branch)
            .ok_or_else(|| branch_not_found(&location.repo, &location.branch))?
            .files
            .get(&location.path)
            .ok_or_else(|| RemoteError::NotFound(format!("File not found: {}/{}", location.repo.full_name(), location.path)))?;
        Ok(RemoteFile {
            sha: blob_sha(content),
            size: content.len(),
            content: content.to_owned(),
        })
    }

    fn commit_file(
        &mut self,
        location: &FileLocation,
        content: &[u8],
        request: &CommitRequest,
    ) -> Result<CommitReceipt, RemoteError> {
        info!(repo = %location.repo.full_name(), path = %location.path, branch = %location.branch, "Committing file");
        let repository = self.repository_mut(&location.repo)?;
        if !repository.branches.contains_key(&location.branch) {
            info!(branch = %location.branch, "Branch does not exist, creating it from the default branch");
            let source = repository
                .branches
                .get(&repository.default_branch)
                .cloned()
                .ok_or_else(|| branch_not_found(&location.repo, &repository.default_branch))?;
            repository.branches.insert(location.branch.to_owned(), source);
        }
        let branch = repository
            .branches
            .get_mut(&location.branch)
            .ok_or_else(|| branch_not_found(&location.repo, &location.branch))?;

        let existing = branch.files.get(&location.path).map(|content| blob_sha(content));
        if let Some(expected) = &request.expected_sha {
            if existing.as_ref() != Some(expected) {
                warn!(path = %location.path, expected = %expected, actual = ?existing, "Rejected stale commit");
                return Err(RemoteError::Conflict(format!(
                    "{} does not match {}",
                    location.path, expected
                )));
            }
        }

        branch.files.insert(location.path.to_owned(), content.to_vec());
        let message = format!("{}\n{} <{}>", request.message, request.author.name, request.author.email);
        branch.head = commit_sha(&branch.head, &message, &branch.files);
        info!(commit = %branch.head, "File committed");
        Ok(CommitReceipt {
            commit_sha: branch.head.to_owned(),
            content_sha: blob_sha(content),
            branch: location.branch.to_owned(),
            html_url: format!("https://github.com/{}/commit/{}", location.repo.full_name(), branch.head),
        })
    }

    fn create_branch(&mut self, repo: &RepoRef, branch: &str, from: &str) -> Result<BranchReceipt, RemoteError> {
        info!(repo = %repo.full_name(), branch, from, "Creating branch");
        let repository = self.repository_mut(repo)?;
        if repository.branches.contains_key(branch) {
            return Err(RemoteError::AlreadyExists(format!("Branch {} already exists", branch)));
        }
        let source = repository
            .branches
            .get(from)
            .cloned()
            .ok_or_else(|| branch_not_found(repo, from))?;
        let sha = source.head.to_owned();
        repository.branches.insert(branch.to_owned(), source);
        Ok(BranchReceipt {
            branch_name: branch.to_owned(),
            sha,
        })
    }

    fn create_pull_request(
        &mut self,
        repo: &RepoRef,
        request: &PullRequestRequest,
    ) -> Result<PullRequestReceipt, RemoteError> {
        info!(repo = %repo.full_name(), head = %request.head, base = %request.base, "Creating pull request");
        let repository = self.repository_mut(repo)?;
        for branch in [&request.head, &request.base] {
            if !repository.branches.contains_key(branch.as_str()) {
                return Err(branch_not_found(repo, branch));
            }
        }
        if request.head == request.base {
            return Err(RemoteError::Generic(format!("No commits between {} and {}", request.base, request.head)));
        }
        if let Some(open) = repository.pulls.iter().find(|pull| pull.head == request.head && pull.base == request.base) {
            return Err(RemoteError::AlreadyExists(format!(
                "A pull request already exists for {} (#{})",
                request.head, open.number
            )));
        }
        let number = repository.pulls.len() as u64 + 1;
        repository.pulls.push(PullRequest {
            number,
            head: request.head.to_owned(),
            base: request.base.to_owned(),
        });
        info!(number, "Pull request created");
        Ok(PullRequestReceipt {
            number,
            url: format!("https://github.com/{}/pull/{}", repo.full_name(), number),
        })
    }
}
