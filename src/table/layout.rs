//! Locates the `RuleTable` anchor row and derives the header offsets from it.

use crate::grid::Grid;
use crate::table::model::HeaderRows;
use crate::table::model::DEFAULT_ANCHOR_ROW;
use crate::table::FormatError;
use tracing::debug;

pub const TABLE_MARKER: &str = "RuleTable";
pub const SCAN_FIRST_ROW: usize = 5;
pub const SCAN_LAST_ROW: usize = 10;
pub const UNKNOWN_TABLE_NAME: &str = "Unknown";

/// Where the table starts and what it is called.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub row: usize,
    pub name: String,
    pub header_rows: HeaderRows,
}

fn is_anchor(grid: &Grid, row: usize) -> bool {
    grid.text(row, 1)
        .is_some_and(|text| text.starts_with(TABLE_MARKER))
}

/// First anchor row in the scan window, trying the conventional row first.
pub fn find_anchor_row(grid: &Grid) -> Option<usize> {
    if is_anchor(grid, DEFAULT_ANCHOR_ROW) {
        return Some(DEFAULT_ANCHOR_ROW);
    }
    (SCAN_FIRST_ROW..=SCAN_LAST_ROW).find(|row| is_anchor(grid, *row))
}

/// Strips the marker from the anchor text; a bare marker names the table "Unknown".
pub fn table_name(anchor_text: &str) -> String {
    let name = anchor_text.strip_prefix(TABLE_MARKER).unwrap_or(anchor_text).trim();
    if name.is_empty() {
        UNKNOWN_TABLE_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

pub fn locate(grid: &Grid) -> Result<Anchor, FormatError> {
    let row = find_anchor_row(grid).ok_or(FormatError::TableDeclarationNotFound)?;
    let name = table_name(&grid.text(row, 1).unwrap_or_default());
    debug!(row, table = %name, "Found table anchor");
    Ok(Anchor {
        row,
        name,
        header_rows: HeaderRows::from_anchor(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_row_wins() {
        let mut grid = Grid::new("Rules");
        grid.set(5, 1, "RuleTable Early");
        grid.set(6, 1, "RuleTable Offers");

        let anchor = locate(&grid).unwrap();
        assert_eq!(anchor.row, 6);
        assert_eq!(anchor.name, "Offers");
        assert_eq!(anchor.header_rows.first_rule_row, 11);
    }

    #[test]
    fn scans_the_window() {
        let mut grid = Grid::new("Rules");
        grid.set(9, 1, "  RuleTable   Discounts ");
        let anchor = locate(&grid).unwrap();
        assert_eq!((anchor.row, anchor.name.as_str()), (9, "Discounts"));
        assert_eq!(anchor.header_rows.column_types, 10);
        assert_eq!(anchor.header_rows.first_rule_row, 14);
    }

    #[test]
    fn outside_the_window_is_not_found() {
        let mut grid = Grid::new("Rules");
        grid.set(4, 1, "RuleTable Top");
        grid.set(11, 1, "RuleTable Bottom");
        grid.set(7, 2, "RuleTable WrongColumn");
        assert_eq!(locate(&grid), Err(FormatError::TableDeclarationNotFound));
    }

    #[test]
    fn names() {
        assert_eq!(table_name("RuleTable Offers"), "Offers");
        assert_eq!(table_name("RuleTable"), "Unknown");
        assert_eq!(table_name("RuleTableX"), "X");
    }
}
