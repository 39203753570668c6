//! Text-only fallback row extraction.
//!
//! Used when positional extraction finds no header or no rows. Works on the
//! assembled text alone, splitting lines on runs of two or more whitespace
//! characters.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{
    ExtractionConfig, DESCRIPTION_COLUMN, PRODUCT_COLUMN, QUANTITY_COLUMN, ROW_NUMBER_COLUMN,
};
use crate::extractors::record::{Deduplicator, RowRecord};
use crate::extractors::rows::apply_stoplist;
use crate::layout::split_cells;

lazy_static! {
    /// A bare row number such as `3` or `3.`
    static ref RE_ROW_NUMBER: Regex = Regex::new(r"^\d+\.?$").unwrap();
}

/// Index of the first line containing every header marker.
pub fn find_header_line(lines: &[&str], config: &ExtractionConfig) -> Option<usize> {
    lines.iter().position(|line| {
        let line = line.trim();
        !config.header_markers.is_empty()
            && config
                .header_markers
                .iter()
                .all(|marker| line.contains(marker.as_str()))
    })
}

/// Interpret one line's cells as a row.
///
/// When the first cell is a row number the remaining cells are product,
/// description and quantity; otherwise the first cell is already the product.
fn parse_row(cells: &[String]) -> RowRecord {
    let (row_number, rest) = match cells.split_first() {
        Some((first, rest)) if RE_ROW_NUMBER.is_match(first) => (first.replace('.', ""), rest),
        _ => (String::new(), cells),
    };
    let field = |i: usize| rest.get(i).cloned().unwrap_or_default();

    RowRecord::from_pairs([
        (ROW_NUMBER_COLUMN, row_number),
        (PRODUCT_COLUMN, field(0)),
        (DESCRIPTION_COLUMN, field(1)),
        (QUANTITY_COLUMN, field(2)),
    ])
}

/// Extract rows from assembled text.
///
/// # Examples
///
/// ```
/// use ship_ticket::config::ExtractionConfig;
/// use ship_ticket::extractors::extract_lexical_rows;
///
/// let text = "Estimate\n#  Product or service  Description  Qty\n1.  WIDGET-1  Blue widget  12\n";
/// let rows = extract_lexical_rows(text, &ExtractionConfig::default());
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].row_number(), "1");
/// assert_eq!(rows[0].quantity(), "12");
/// ```
pub fn extract_lexical_rows(text: &str, config: &ExtractionConfig) -> Vec<RowRecord> {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(header_index) = find_header_line(&lines, config) else {
        log::debug!("Lexical fallback found no header line");
        return Vec::new();
    };

    let mut dedup = Deduplicator::new();
    let mut rows = Vec::new();

    for line in lines.iter().skip(header_index + 1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cells = split_cells(line);
        if cells.len() < config.min_table_cells {
            continue;
        }

        let record = parse_row(&cells);
        if record.product().is_empty() && record.description().is_empty() {
            continue;
        }
        if dedup.admit(&record) {
            rows.push(record);
        }
    }

    apply_stoplist(rows, config)
}
