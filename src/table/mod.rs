//! # Decision Table Codec
//!
//! Turns a [`Grid`] into a normalized [`TableDocument`] and back. The layout is purely
//! positional: metadata in rows 1-4, a `RuleTable` anchor somewhere in rows 5-10, four header
//! rows below the anchor and one rule per row after that.
use crate::grid::Grid;
use thiserror::Error;
use tracing::info;

pub mod columns;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod rules;
pub mod serializer;
pub mod validator;

pub use model::CellEntry;
pub use model::Column;
pub use model::ColumnId;
pub use model::ColumnKind;
pub use model::HeaderRows;
pub use model::Metadata;
pub use model::Rule;
pub use model::RuleId;
pub use model::RuleTable;
pub use model::TableDocument;
pub use validator::ValidationReport;

/// A required structural marker is missing; the source document itself must be fixed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// No `RuleTable` marker in column A of the scan window
    #[error("table declaration not found in rows 5-10")]
    TableDeclarationNotFound,

    /// The workbook declares no worksheet at all
    #[error("no worksheet found")]
    WorksheetNotFound,

    /// The format pre-check rejected the document
    #[error("Invalid decision table: {}", .0.join("; "))]
    Rejected(Vec<String>),
}

/// Extracts the full table document from a grid.
///
/// Metadata is read leniently; a missing anchor fails the whole parse, since every header
/// offset depends on it.
pub fn parse_grid(grid: &Grid) -> Result<TableDocument, FormatError> {
    info!(sheet = %grid.name, rows = grid.row_count(), columns = grid.column_count(), "Parsing decision table");

    let metadata = metadata::extract(grid);
    let anchor = layout::locate(grid)?;
    let columns = columns::extract(grid, &anchor.header_rows);
    let rules = rules::extract(grid, &anchor.header_rows, &columns);

    info!(table = %anchor.name, columns = columns.len(), rules = rules.len(), "Parsed decision table");
    Ok(TableDocument {
        metadata,
        rule_table: RuleTable {
            name: anchor.name,
            columns,
            rules,
            start_row: anchor.row,
            header_rows: anchor.header_rows,
        },
        worksheet_name: grid.name.to_owned(),
        total_rows: grid.row_count(),
        total_columns: grid.column_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_anchor_fails_the_parse() {
        let mut grid = Grid::new("Rules");
        grid.set(1, 1, "RuleSet");
        grid.set(1, 2, "com.example");
        grid.set(11, 1, "RuleTable Late");

        assert_eq!(parse_grid(&grid), Err(FormatError::TableDeclarationNotFound));
    }

    #[test]
    fn document_records_sheet_extent() {
        let mut grid = Grid::new("Sheet7");
        grid.set(5, 1, "RuleTable Moved");
        grid.set(6, 1, "NAME");
        grid.set(10, 1, "R1");
        grid.set(10, 4, "x");

        let document = parse_grid(&grid).unwrap();
        assert_eq!(document.worksheet_name, "Sheet7");
        assert_eq!((document.total_rows, document.total_columns), (10, 4));
        assert_eq!(document.rule_table.start_row, 5);
        assert_eq!(document.rule_table.header_rows.first_rule_row, 10);
        assert_eq!(document.metadata, Metadata::default());
        assert_eq!(document.rule_table.rules.len(), 1);
    }

    #[test]
    fn rejection_lists_every_problem() {
        let error = FormatError::Rejected(vec!["first".to_owned(), "second".to_owned()]);
        assert_eq!(error.to_string(), "Invalid decision table: first; second");
    }
}
