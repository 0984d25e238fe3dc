//! A1-style cell reference conversion.
//! All indexes handled here are 1-based, matching the row/column numbers users see.

use regex::Regex;
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("Hardcode regex pattern"))
}

/// Converts column letters ("A", "AB") to a 1-based column index.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        if letter.is_ascii_alphabetic() {
            let digit = (letter.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            index.checked_mul(26)?.checked_add(digit)
        } else {
            None
        }
    })
}

/// Converts a 1-based column index to column letters (1 -> "A", 28 -> "AB").
pub fn index_to_col(index: usize) -> String {
    let mut column = index;
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push((b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters.iter().rev().collect()
}

/// Parses an A1 reference ("B12") into a 1-based `(row, column)` pair.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = reference_pattern().captures(reference.trim())?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = captures.get(2)?.as_str().parse::<usize>().ok()?;
    Some((row, col))
}

/// Formats a 1-based `(row, column)` pair as an A1 reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row)
}
