//! Workflows tying the codec, the editing session and the remote repository together.

use crate::config::UploadPolicy;
use crate::config::WriteOptions;
use crate::error::ResultMessage;
use crate::error::RustyRulesError;
use crate::remote::Author;
use crate::remote::CommitReceipt;
use crate::remote::CommitRequest;
use crate::remote::FileLocation;
use crate::remote::PullRequestReceipt;
use crate::remote::PullRequestRequest;
use crate::remote::RemoteRepository;
use crate::session::PendingPull;
use crate::session::Session;
use crate::table::model::TableDocument;
use crate::table::serializer;
use crate::table::validator;
use crate::table::FormatError;
use chrono::DateTime;
use chrono::Utc;
use tracing::error;
use tracing::info;

/// A parsed remote document with the content hash it was fetched at.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedDocument {
    pub document: TableDocument,
    pub sha: String,
}

/// What [`publish`] commits and proposes.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishRequest {
    pub branch: String,
    pub commit_message: String,
    pub author: Author,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PublishReceipt {
    pub commit: CommitReceipt,
    pub pull_request: PullRequestReceipt,
}

/// Work branch name for a change made at `now`.
pub fn suggested_branch_name(now: DateTime<Utc>) -> String {
    format!("rule-update-{}", now.timestamp_millis())
}

/// Accepts an uploaded workbook: policy limits, then the format pre-check, then a full parse.
pub fn load_upload(file_name: &str, bytes: &[u8], policy: &UploadPolicy) -> Result<TableDocument, RustyRulesError> {
    info!(file = file_name, size = bytes.len(), "Loading uploaded workbook");
    policy.check(file_name, bytes)?;
    let report = validator::validate(bytes);
    if !report.is_valid {
        return Err(FormatError::Rejected(report.errors).into());
    }
    crate::parse(bytes)
}

pub fn fetch_document<R: RemoteRepository + ?Sized>(
    repo: &R,
    location: &FileLocation,
) -> Result<FetchedDocument, RustyRulesError> {
    let file = repo.fetch_file(location).inspect_err(|e| error!(error = %e, "Fetch failed"))?;
    let document = crate::parse(&file.content)
        .inspect_err(|e| error!(path = %location.path, error = %e, "Fetched file is not a decision table"))?;
    Ok(FetchedDocument {
        document,
        sha: file.sha,
    })
}

/// Fetches the remote version and classifies it against the session's document.
pub fn pull<R: RemoteRepository + ?Sized>(
    session: &Session,
    repo: &R,
    location: &FileLocation,
) -> Result<PendingPull, RustyRulesError> {
    let fetched = fetch_document(repo, location)?;
    let pending = session.begin_pull(fetched.document, Some(fetched.sha));
    info!(has_differences = pending.has_differences, "Pulled remote document");
    Ok(pending)
}

/// Serializes the session's document and commits it.
///
/// Without an explicit `expected_sha` the commit expects the session's base hash, so a remote
/// file that moved since it was fetched is reported as a conflict instead of being overwritten.
pub fn push<R: RemoteRepository + ?Sized>(
    session: &mut Session,
    repo: &mut R,
    location: &FileLocation,
    commit: &CommitRequest,
) -> Result<CommitReceipt, RustyRulesError> {
    let commit = CommitRequest {
        expected_sha: commit.expected_sha.to_owned().or_else(|| session.base_sha().map(str::to_owned)),
        ..commit.clone()
    };
    let bytes = serializer::serialize(session.document(), &WriteOptions::default())?;
    let receipt = repo
        .commit_file(location, &bytes, &commit)
        .inspect_err(|e| error!(error = %e, "Commit failed"))?;
    session.set_base_sha(&receipt.content_sha);
    session.mark_saved();
    Ok(receipt)
}

/// Commits the document to `request.branch` and opens a pull request into `location.branch`.
///
/// The work branch is created from the default branch when missing; the session's base hash is
/// left alone since `location.branch` itself does not change.
pub fn publish<R: RemoteRepository + ?Sized>(
    session: &mut Session,
    repo: &mut R,
    location: &FileLocation,
    request: &PublishRequest,
) -> Result<PublishReceipt, RustyRulesError> {
    let commit = CommitRequest {
        message: request.commit_message.to_owned(),
        author: request.author.to_owned(),
        expected_sha: None,
    };
    let bytes = serializer::serialize(session.document(), &WriteOptions::default())
        .with_prefix("Failed to publish")?;
    let commit = repo
        .commit_file(&location.on_branch(&request.branch), &bytes, &commit)
        .inspect_err(|e| error!(error = %e, "Commit failed"))?;
    session.mark_saved();
    let pull_request = repo
        .create_pull_request(
            &location.repo,
            &PullRequestRequest {
                title: request.title.to_owned(),
                body: request.body.to_owned(),
                head: request.branch.to_owned(),
                base: location.branch.to_owned(),
            },
        )
        .inspect_err(|e| error!(error = %e, "Pull request failed"))?;
    Ok(PublishReceipt { commit, pull_request })
}
