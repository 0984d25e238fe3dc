//! # Rusty Rules
//!
//! A codec and reconciliation engine for spreadsheet-encoded decision tables.
//!
//! A decision table is a single worksheet with a fixed positional layout: rule-set metadata in
//! rows 1-4, a `RuleTable {name}` declaration in column A of rows 5-10, four header rows
//! (column kind, object binding, pattern template, label) and then one rule per row.
//!
//! ## Features
//!
//! - **Parsing**: `.xlsx` bytes to a normalized [`TableDocument`], failing with a
//!   [`FormatError`] when a required marker is missing or a [`CodecError`] when the container
//!   itself is unreadable
//! - **Serialization**: a fresh, deterministic single-worksheet `.xlsx` regenerated from the model
//! - **Validation**: a cheap pre-check that never fails and reports every missing marker
//! - **Diffing**: rule-name keyed classification of two versions into added, deleted and
//!   modified rules, plus a column-schema change flag
//! - **Editing sessions**: explicit ownership of one document, with pulls resolved by an explicit
//!   [`Resolution`]
//! - **Remote sync**: fetch, commit, branch and pull-request workflows against any
//!   [`RemoteRepository`]
//!
//! The library logs through `tracing` and never installs a subscriber.
mod error;
mod helpers;

pub mod config;
pub mod diff;
pub mod grid;
pub mod remote;
pub mod request;
pub mod session;
pub mod sync;
pub mod table;

pub use crate::config::RemoteConfig;
pub use crate::config::UploadPolicy;
pub use crate::config::WriteOptions;
pub use crate::diff::ModifiedRule;
pub use crate::diff::TableDiff;
pub use crate::error::RustyRulesError;
pub use crate::grid::CellValue;
pub use crate::grid::CodecError;
pub use crate::grid::Grid;
pub use crate::helpers::reference;
pub use crate::remote::RemoteError;
pub use crate::remote::RemoteRepository;
pub use crate::request::GenerateRequest;
pub use crate::request::ValidationError;
pub use crate::session::PendingPull;
pub use crate::session::PullOutcome;
pub use crate::session::Resolution;
pub use crate::session::Session;
pub use crate::table::FormatError;
pub use crate::table::TableDocument;
pub use crate::table::ValidationReport;

use anyhow::Context;
use anyhow::Result;
use std::fs;
use std::path::Path;

/// Parses `.xlsx` bytes into a table document.
///
/// # Errors
///
/// * [`CodecError`] when the bytes are not a readable spreadsheet container
/// * [`FormatError`] when the workbook has no worksheet or no table declaration in rows 5-10
pub fn parse(bytes: &[u8]) -> Result<TableDocument, RustyRulesError> {
    let grid = grid::xlsx::read_first_sheet(bytes)?;
    Ok(table::parse_grid(&grid)?)
}

/// Serializes a document into a fresh single-worksheet `.xlsx` package.
pub fn serialize(document: &TableDocument) -> Result<Vec<u8>, RustyRulesError> {
    table::serializer::serialize(document, &WriteOptions::default())
}

/// Checks the required markers without building the model. Never fails.
pub fn validate(bytes: &[u8]) -> ValidationReport {
    table::validator::validate(bytes)
}

/// Classifies the rules of `pulled` against `current`.
pub fn diff(current: &TableDocument, pulled: &TableDocument) -> TableDiff {
    diff::diff(current, pulled)
}

/// Reads and parses a workbook from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<TableDocument> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    parse(&bytes).with_context(|| format!("Failed to parse '{}'", path.display()))
}

/// Serializes a document and writes it to disk.
pub fn write_file(document: &TableDocument, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = serialize(document).context("Failed to serialize decision table")?;
    fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))
}
