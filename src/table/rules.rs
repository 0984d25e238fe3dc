//! Rule rows below the header block.

use crate::grid::Grid;
use crate::table::model::Column;
use crate::table::model::HeaderRows;
use crate::table::model::Rule;
use crate::table::model::RuleId;
use tracing::debug;

/// Reads one rule per occupied row with a non-blank column A.
///
/// Every non-index-1 column of kind CONDITION or ACTION gets an entry in every rule, blank cells
/// included.
pub fn extract(grid: &Grid, header_rows: &HeaderRows, columns: &[Column]) -> Vec<Rule> {
    let mut rules = Vec::new();
    for row in grid.rows_from(header_rows.first_rule_row) {
        let Some(rule_name) = grid.text(row, 1) else {
            continue;
        };
        let mut rule = Rule::new(RuleId(row), &rule_name);
        rule.row_index = Some(row);
        for column in columns.iter().filter(|column| column.index != 1) {
            let value = grid.text(row, column.index).unwrap_or_default();
            if let Some(entries) = rule.entries_mut(&column.kind) {
                entries.insert(column.id, column.entry(&value));
            }
        }
        rules.push(rule);
    }
    debug!(count = rules.len(), "Extracted rule rows");
    rules
}

/// Writes rules in order from `header_rows.first_rule_row`, ignoring their recorded rows.
/// Empty values leave the cell unset.
pub fn write(grid: &mut Grid, header_rows: &HeaderRows, columns: &[Column], rules: &[Rule]) {
    for (offset, rule) in rules.iter().enumerate() {
        let row = header_rows.first_rule_row + offset;
        grid.set(row, 1, rule.rule_name.as_str());
        for column in columns.iter().filter(|column| column.index != 1) {
            if let Some(value) = rule.value(column).filter(|value| !value.is_empty()) {
                grid.set(row, column.index, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::model::ColumnId;
    use crate::table::model::ColumnKind;

    fn column(index: usize, kind: ColumnKind, label: &str) -> Column {
        Column {
            id: ColumnId(index),
            index,
            kind,
            object_binding: String::new(),
            pattern_template: format!("t{}($param)", index),
            label: label.to_owned(),
        }
    }

    fn columns() -> Vec<Column> {
        vec![
            column(1, ColumnKind::Name, "Rule Name"),
            column(2, ColumnKind::Condition, "Age"),
            column(3, ColumnKind::Action, "Discount"),
            column(4, ColumnKind::Other("NOTE".to_owned()), "Note"),
        ]
    }

    #[test]
    fn blank_rows_do_not_stop_extraction() {
        let mut grid = Grid::new("Rules");
        grid.set(11, 1, "R1");
        grid.set(11, 2, 30.0);
        grid.set(11, 3, " 10 ");
        grid.set(11, 4, "ignored");
        grid.set(12, 2, "no name");
        grid.set(14, 1, "R2");

        let rules = extract(&grid, &HeaderRows::from_anchor(6), &columns());
        assert_eq!(rules.len(), 2);

        let first = &rules[0];
        assert_eq!((first.id, first.row_index), (RuleId(11), Some(11)));
        assert_eq!(first.conditions[&ColumnId(2)].value, "30");
        assert_eq!(first.conditions[&ColumnId(2)].label, "Age");
        assert_eq!(first.conditions[&ColumnId(2)].pattern_template, "t2($param)");
        assert_eq!(first.actions[&ColumnId(3)].value, "10");
        assert_eq!(first.conditions.len() + first.actions.len(), 2);

        let second = &rules[1];
        assert_eq!(second.rule_name, "R2");
        assert_eq!(second.id, RuleId(14));
        assert_eq!(second.conditions[&ColumnId(2)].value, "");
    }

    #[test]
    fn far_rows_cost_nothing_extra() {
        let mut grid = Grid::new("Rules");
        grid.set(11, 1, "R1");
        grid.set(usize::MAX / 2, 1, "Far");

        let rules = extract(&grid, &HeaderRows::from_anchor(6), &columns());
        let rows: Vec<_> = rules.iter().map(|rule| rule.row_index).collect();
        assert_eq!(rows, vec![Some(11), Some(usize::MAX / 2)]);
    }

    #[test]
    fn writes_sequentially() {
        let rows = HeaderRows::from_anchor(6);
        let mut grid = Grid::new("Rules");
        grid.set(11, 1, "R1");
        grid.set(20, 1, "R2");
        grid.set(20, 3, "5");
        let rules = extract(&grid, &rows, &columns());

        let mut written = Grid::new("Rules");
        write(&mut written, &rows, &columns(), &rules);
        assert_eq!(written.text(12, 1).as_deref(), Some("R2"));
        assert_eq!(written.text(12, 3).as_deref(), Some("5"));
        assert_eq!(written.row_count(), 12);
    }
}
