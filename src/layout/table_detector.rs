//! Lexical table-row detection.
//!
//! A line is tabular when it carries a number or a currency amount and its
//! text contains a run of two or more whitespace characters. The whitespace
//! run is the layout signal: source documents that align fields into visual
//! columns pad them with spaces, prose does not.

use lazy_static::lazy_static;
use regex::Regex;

use crate::layout::lines::TextLine;

lazy_static! {
    /// Any digit
    static ref RE_DIGIT: Regex = Regex::new(r"\d").unwrap();

    /// Currency amount such as `$450` or `$450.00`
    static ref RE_CURRENCY: Regex = Regex::new(r"\$\d+(\.\d+)?").unwrap();

    /// Column separator: two or more whitespace characters
    static ref RE_COLUMN_GAP: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Whether a line of text looks like a table row.
///
/// # Examples
///
/// ```
/// use ship_ticket::layout::is_table_row;
///
/// assert!(is_table_row("Subtotal    $450.00"));
/// assert!(!is_table_row("Thank you for your business"));
/// assert!(!is_table_row("Total 450.00"));
/// ```
pub fn is_table_row(line: &str) -> bool {
    let has_value = RE_DIGIT.is_match(line) || RE_CURRENCY.is_match(line);
    has_value && RE_COLUMN_GAP.is_match(line)
}

/// Split a line into cells on runs of two or more whitespace characters.
///
/// Cells are trimmed and empty cells dropped.
///
/// # Examples
///
/// ```
/// use ship_ticket::layout::split_cells;
///
/// assert_eq!(split_cells("  1.  WIDGET-1   Blue widget  12 "), ["1.", "WIDGET-1", "Blue widget", "12"]);
/// ```
pub fn split_cells(line: &str) -> Vec<String> {
    RE_COLUMN_GAP
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect the tabular lines of a page as cell rows.
///
/// Only lines classified by [`is_table_row`] that split into at least
/// `min_cells` cells are kept.
pub fn detect_table_lines(lines: &[TextLine], min_cells: usize) -> Vec<Vec<String>> {
    lines
        .iter()
        .filter(|line| is_table_row(&line.text))
        .map(|line| split_cells(&line.text))
        .filter(|cells| cells.len() >= min_cells)
        .collect()
}
