//! Header metadata in rows 1-4: marker in column A, value in column B.

use crate::grid::Grid;
use crate::table::model::Metadata;

pub const RULE_SET_MARKER: &str = "RuleSet";
pub const IMPORT_MARKER: &str = "Import";
pub const VARIABLES_MARKER: &str = "Variables";
pub const NOTES_MARKER: &str = "Notes";

pub const RULE_SET_ROW: usize = 1;
pub const IMPORT_ROW: usize = 2;
pub const VARIABLES_ROW: usize = 3;
pub const NOTES_ROW: usize = 4;

/// Returns the column B text of `row` if column A starts with `marker`.
///
/// A present marker with a blank value yields `Some("")`.
fn marked_value(grid: &Grid, row: usize, marker: &str) -> Option<String> {
    let label = grid.text(row, 1)?;
    if !label.starts_with(marker) {
        return None;
    }
    Some(grid.text(row, 2).unwrap_or_default())
}

/// Splits a comma-joined list into trimmed pieces. Empty pieces between commas are kept; a blank
/// value is an empty list.
pub fn split_list(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',').map(|item| item.trim().to_owned()).collect()
}

/// Reads the four metadata rows. Never fails: absent markers leave the field `None`.
pub fn extract(grid: &Grid) -> Metadata {
    Metadata {
        rule_set: marked_value(grid, RULE_SET_ROW, RULE_SET_MARKER),
        imports: marked_value(grid, IMPORT_ROW, IMPORT_MARKER).map(|text| split_list(&text)),
        variables: marked_value(grid, VARIABLES_ROW, VARIABLES_MARKER).map(|text| split_list(&text)),
        notes: marked_value(grid, NOTES_ROW, NOTES_MARKER),
    }
}

/// Writes the metadata rows. Fields that are absent or empty write nothing.
pub fn write(grid: &mut Grid, metadata: &Metadata) {
    if let Some(rule_set) = metadata.rule_set.as_deref().filter(|text| !text.is_empty()) {
        grid.set(RULE_SET_ROW, 1, RULE_SET_MARKER);
        grid.set(RULE_SET_ROW, 2, rule_set);
    }
    if let Some(imports) = metadata.imports.as_ref().filter(|items| !items.is_empty()) {
        grid.set(IMPORT_ROW, 1, IMPORT_MARKER);
        grid.set(IMPORT_ROW, 2, imports.join(", "));
    }
    if let Some(variables) = metadata.variables.as_ref().filter(|items| !items.is_empty()) {
        grid.set(VARIABLES_ROW, 1, VARIABLES_MARKER);
        grid.set(VARIABLES_ROW, 2, variables.join(", "));
    }
    if let Some(notes) = metadata.notes.as_deref().filter(|text| !text.is_empty()) {
        grid.set(NOTES_ROW, 1, NOTES_MARKER);
        grid.set(NOTES_ROW, 2, notes);
    }
}
