//! # Cell Grid
//!
//! A sparse, 1-based, single-worksheet view of a spreadsheet. The decision-table extractors only
//! ever address individual cells, so the grid keeps the values it was given and reports the
//! occupied row/column extent the way spreadsheet tools report `rowCount`/`columnCount`.
use crate::helpers::reference::reference_to_index;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

pub mod writer;
pub mod xlsx;

/// The container bytes could not be read as a spreadsheet package.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unreadable spreadsheet container: {0}")]
    Container(String),

    #[error("Malformed spreadsheet XML: {0}")]
    Xml(String),

    #[error("Missing workbook part '{0}'")]
    MissingPart(String),
}

/// A single untyped cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    /// Renders the value as the trimmed string every extractor works with.
    pub fn render(&self) -> String {
        self.to_string().trim().to_owned()
    }

    /// Returns true when the value renders to an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Number(number) => write!(f, "{}", render_number(*number)),
            CellValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Integral values print without a fraction ("30", not "30.0").
fn render_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

/// One worksheet of cells addressed by 1-based `(row, column)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    /// Worksheet name
    pub name: String,
    cells: BTreeMap<(usize, usize), CellValue>,
    row_count: usize,
    column_count: usize,
}

impl Grid {
    pub fn new(name: &str) -> Self {
        Grid {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Highest occupied row number (0 for an empty sheet).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Highest occupied column number (0 for an empty sheet).
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Looks a cell up by A1 reference ("B4").
    pub fn get_ref(&self, reference: &str) -> Option<&CellValue> {
        let (row, col) = reference_to_index(reference)?;
        self.get(row, col)
    }

    /// Trimmed text of a cell, or `None` when the cell is absent or blank.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col)
            .filter(|value| !value.is_blank())
            .map(CellValue::render)
            .filter(|text| !text.is_empty())
    }

    /// Same as [`Grid::text`] but addressed by A1 reference.
    pub fn text_ref(&self, reference: &str) -> Option<String> {
        let (row, col) = reference_to_index(reference)?;
        self.text(row, col)
    }

    /// Stores a value. Empty values clear the cell; row 0 and column 0 are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }
        let value = value.into();
        if value == CellValue::Empty {
            self.cells.remove(&(row, col));
            self.recount();
        } else {
            self.cells.insert((row, col), value);
            self.row_count = self.row_count.max(row);
            self.column_count = self.column_count.max(col);
        }
    }

    /// Iterates occupied cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> {
        self.cells.iter().map(|((row, col), value)| (*row, *col, value))
    }

    /// Occupied row numbers from `first` on, ascending. Unoccupied rows are never visited.
    pub fn rows_from(&self, first: usize) -> impl Iterator<Item = usize> + '_ {
        let mut last = None;
        self.cells
            .range((first, 0)..)
            .map(|((row, _), _)| *row)
            .filter(move |row| last.replace(*row) != Some(*row))
    }

    /// Occupied column numbers of `row`, ascending.
    pub fn columns_in_row(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells.range((row, 0)..=(row, usize::MAX)).map(|((_, col), _)| *col)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn recount(&mut self) {
        self.row_count = self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0);
        self.column_count = self.cells.keys().map(|(_, col)| *col).max().unwrap_or(0);
    }
}
