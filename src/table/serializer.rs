//! Regenerates a fresh worksheet from a [`TableDocument`].
//!
//! The output is normalized: the anchor always lands on row 6 and rules are written one per row
//! in list order, whatever positions the document was originally read from.

use crate::config::WriteOptions;
use crate::error::ResultMessage;
use crate::error::RustyRulesError;
use crate::grid::writer::write_xlsx;
use crate::grid::Grid;
use crate::table::columns;
use crate::table::layout::TABLE_MARKER;
use crate::table::metadata;
use crate::table::model::ColumnKind;
use crate::table::model::HeaderRows;
use crate::table::model::TableDocument;
use crate::table::model::DEFAULT_ANCHOR_ROW;
use crate::table::model::DEFAULT_NAME_LABEL;
use crate::table::rules;
use tracing::info;

/// Lays the document out on a new grid.
pub fn to_grid(document: &TableDocument, options: &WriteOptions) -> Grid {
    let sheet_name = match document.worksheet_name.trim() {
        "" => options.worksheet_name.as_str(),
        name => name,
    };
    let mut grid = Grid::new(sheet_name);
    let table = &document.rule_table;

    metadata::write(&mut grid, &document.metadata);
    grid.set(DEFAULT_ANCHOR_ROW, 1, format!("{} {}", TABLE_MARKER, table.name));

    let header_rows = HeaderRows::from_anchor(DEFAULT_ANCHOR_ROW);
    if !table.columns.iter().any(|column| column.index == 1) {
        grid.set(header_rows.column_types, 1, ColumnKind::Name.as_str());
        grid.set(header_rows.column_labels, 1, DEFAULT_NAME_LABEL);
    }
    columns::write(&mut grid, &header_rows, &table.columns);
    rules::write(&mut grid, &header_rows, &table.columns, &table.rules);
    grid
}

/// Serializes the document to `.xlsx` bytes.
pub fn serialize(document: &TableDocument, options: &WriteOptions) -> Result<Vec<u8>, RustyRulesError> {
    let grid = to_grid(document, options);
    let bytes = write_xlsx(&grid).with_prefix("Generate workbook failed")?;
    info!(
        table = %document.rule_table.name,
        rules = document.rule_table.rules.len(),
        size = bytes.len(),
        "Serialized decision table"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::model::Column;
    use crate::table::model::ColumnId;
    use crate::table::model::Rule;
    use crate::table::model::RuleId;
    use crate::table::parse_grid;

    fn document() -> TableDocument {
        let mut document = TableDocument::new("com.example.rules", "Offers");
        document.rule_table.columns.push(Column {
            id: ColumnId(2),
            index: 2,
            kind: ColumnKind::Condition,
            object_binding: "$c:Customer".to_owned(),
            pattern_template: "$c.getAge() > ($param)".to_owned(),
            label: "Age".to_owned(),
        });
        let mut rule = Rule::new(RuleId(11), "R1");
        let entry = document.rule_table.columns[1].entry("30");
        rule.conditions.insert(ColumnId(2), entry);
        document.rule_table.rules.push(rule);
        document
    }

    #[test]
    fn lays_out_fixed_rows() {
        let grid = to_grid(&document(), &WriteOptions::default());
        assert_eq!(grid.name, "Rules");
        assert_eq!(grid.text_ref("A1").as_deref(), Some("RuleSet"));
        assert_eq!(grid.text_ref("B1").as_deref(), Some("com.example.rules"));
        assert_eq!(grid.text_ref("A2"), None);
        assert_eq!(grid.text_ref("A6").as_deref(), Some("RuleTable Offers"));
        assert_eq!(grid.text_ref("A7").as_deref(), Some("NAME"));
        assert_eq!(grid.text_ref("B7").as_deref(), Some("CONDITION"));
        assert_eq!(grid.text_ref("B8").as_deref(), Some("$c:Customer"));
        assert_eq!(grid.text_ref("A10").as_deref(), Some("Rule Name"));
        assert_eq!(grid.text_ref("A11").as_deref(), Some("R1"));
        assert_eq!(grid.text_ref("B11").as_deref(), Some("30"));
    }

    #[test]
    fn default_name_header_when_column_one_is_missing() {
        let mut document = document();
        document.rule_table.columns.remove(0);
        document.worksheet_name = String::new();

        let grid = to_grid(&document, &WriteOptions { worksheet_name: "Fallback".to_owned() });
        assert_eq!(grid.name, "Fallback");
        assert_eq!(grid.text_ref("A7").as_deref(), Some("NAME"));
        assert_eq!(grid.text_ref("A10").as_deref(), Some("Rule Name"));

        let reparsed = parse_grid(&grid).unwrap();
        assert_eq!(reparsed.rule_table.columns[0].kind, ColumnKind::Name);
    }

    #[test]
    fn relocates_anchor_to_row_six() {
        let mut grid = Grid::new("Rules");
        grid.set(8, 1, "RuleTable Late");
        grid.set(9, 1, "NAME");
        grid.set(13, 1, "R1");
        let parsed = parse_grid(&grid).unwrap();

        let written = to_grid(&parsed, &WriteOptions::default());
        assert_eq!(written.text_ref("A6").as_deref(), Some("RuleTable Late"));
        assert_eq!(written.text_ref("A11").as_deref(), Some("R1"));
    }

    #[test]
    fn serialized_bytes_are_stable() {
        let options = WriteOptions::default();
        assert_eq!(serialize(&document(), &options).unwrap(), serialize(&document(), &options).unwrap());
    }
}
