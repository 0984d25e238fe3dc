//! Cheap structural pre-check run before a full parse.

use crate::grid::xlsx::read_first_sheet;
use crate::grid::Grid;
use crate::table::layout::find_anchor_row;
use crate::table::metadata::RULE_SET_MARKER;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

/// Outcome of the format pre-check. Errors are in the order they were detected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks the two required markers on an already loaded grid.
pub fn validate_grid(grid: &Grid) -> ValidationReport {
    let mut errors = Vec::new();
    if !grid.text(1, 1).is_some_and(|text| text.starts_with(RULE_SET_MARKER)) {
        errors.push("Missing or invalid RuleSet declaration in A1".to_owned());
    }
    if find_anchor_row(grid).is_none() {
        errors.push("RuleTable declaration not found in expected rows (5-10)".to_owned());
    }
    ValidationReport::from_errors(errors)
}

/// Checks raw workbook bytes. Never fails; unreadable input becomes a single error entry.
pub fn validate(bytes: &[u8]) -> ValidationReport {
    let report = match read_first_sheet(bytes) {
        Ok(grid) => validate_grid(&grid),
        Err(error) => ValidationReport::from_errors(vec![format!("Validation failed: {}", error)]),
    };
    if !report.is_valid {
        warn!(errors = ?report.errors, "Decision table pre-check failed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::writer::write_xlsx;

    #[test]
    fn both_markers_present() {
        let mut grid = Grid::new("Rules");
        grid.set(1, 1, "RuleSet");
        grid.set(7, 1, "RuleTable Offers");
        assert_eq!(validate_grid(&grid), ValidationReport { is_valid: true, errors: vec![] });
    }

    #[test]
    fn missing_rule_set_is_reported_first() {
        let mut grid = Grid::new("Rules");
        grid.set(2, 1, "RuleSet");
        let report = validate_grid(&grid);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "Missing or invalid RuleSet declaration in A1".to_owned(),
                "RuleTable declaration not found in expected rows (5-10)".to_owned(),
            ]
        );
    }

    #[test]
    fn unreadable_bytes_do_not_fail() {
        let report = validate(b"definitely not a zip");
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Validation failed: "));
    }

    #[test]
    fn validates_workbook_bytes() {
        let mut grid = Grid::new("Rules");
        grid.set(1, 1, "RuleSet");
        grid.set(6, 1, "RuleTable X");
        let report = validate(&write_xlsx(&grid).unwrap());
        assert!(report.is_valid);
    }
}
