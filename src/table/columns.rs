//! Column schema: one column per physical sheet column with a declared kind.

use crate::grid::Grid;
use crate::table::model::Column;
use crate::table::model::ColumnId;
use crate::table::model::ColumnKind;
use crate::table::model::HeaderRows;
use tracing::debug;
use tracing::warn;

/// Reads the four header rows for every column with a declared kind.
///
/// Columns without a kind are skipped without stopping the scan, and ids keep the physical
/// position so gaps survive.
pub fn extract(grid: &Grid, header_rows: &HeaderRows) -> Vec<Column> {
    let mut columns = Vec::new();
    for index in grid.columns_in_row(header_rows.column_types) {
        let Some(kind) = grid.text(header_rows.column_types, index) else {
            continue;
        };
        let kind = ColumnKind::parse(&kind);
        if !kind.is_recognized() {
            warn!(index, kind = %kind, "Unrecognized column kind, values will not be extracted");
        }
        columns.push(Column {
            id: ColumnId(index),
            index,
            kind,
            object_binding: grid.text(header_rows.object_binding, index).unwrap_or_default(),
            pattern_template: grid.text(header_rows.pattern_templates, index).unwrap_or_default(),
            label: grid
                .text(header_rows.column_labels, index)
                .unwrap_or_else(|| format!("Column {}", index)),
        });
    }
    debug!(count = columns.len(), "Extracted column schema");
    columns
}

/// Writes the four header rows for every column at its own index.
pub fn write(grid: &mut Grid, header_rows: &HeaderRows, columns: &[Column]) {
    for column in columns {
        let cells = [
            (header_rows.column_types, column.kind.as_str()),
            (header_rows.object_binding, column.object_binding.as_str()),
            (header_rows.pattern_templates, column.pattern_template.as_str()),
            (header_rows.column_labels, column.label.as_str()),
        ];
        for (row, text) in cells.into_iter().filter(|(_, text)| !text.is_empty()) {
            grid.set(row, column.index, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_grid() -> Grid {
        let mut grid = Grid::new("Rules");
        let kinds = ["NAME", "CONDITION", "", "ACTION", "PRIORITY"];
        for (offset, kind) in kinds.iter().enumerate() {
            grid.set(7, offset + 1, *kind);
        }
        grid.set(8, 2, "$c:Customer");
        grid.set(9, 2, "$c.getAge() > ($param)");
        grid.set(10, 1, "Rule Name");
        grid.set(10, 2, "Age");
        grid.set(10, 3, "orphan label");
        grid
    }

    #[test]
    fn blank_kinds_leave_gaps() {
        let columns = extract(&header_grid(), &HeaderRows::from_anchor(6));
        let ids: Vec<_> = columns.iter().map(|column| column.id).collect();
        assert_eq!(ids, vec![ColumnId(1), ColumnId(2), ColumnId(4), ColumnId(5)]);

        assert_eq!(columns[1].kind, ColumnKind::Condition);
        assert_eq!(columns[1].object_binding, "$c:Customer");
        assert_eq!(columns[1].pattern_template, "$c.getAge() > ($param)");
        assert_eq!(columns[1].label, "Age");
        assert_eq!(columns[2].label, "Column 4");
        assert_eq!(columns[2].pattern_template, "");
        assert_eq!(columns[3].kind, ColumnKind::Other("PRIORITY".to_owned()));
    }

    #[test]
    fn written_headers_read_back() {
        let rows = HeaderRows::from_anchor(6);
        let columns = extract(&header_grid(), &rows);
        let mut grid = Grid::new("Rules");
        write(&mut grid, &rows, &columns);
        assert_eq!(extract(&grid, &rows), columns);
    }
}
