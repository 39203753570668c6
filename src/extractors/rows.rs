//! Positional row extraction.
//!
//! Fragments below the header are grouped into rows by their rounded
//! baseline and assigned to columns by their `x` coordinate.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{ExtractionConfig, QUANTITY_COLUMN};
use crate::extractors::columns::Column;
use crate::extractors::record::{Deduplicator, RowRecord};
use crate::geometry::TextFragment;

lazy_static! {
    /// Leading digit run of a quantity such as `12 ea`
    static ref RE_LEADING_DIGITS: Regex = Regex::new(r"^(\d+)").unwrap();
}

/// Leading digit run of `text`, if it starts with a digit.
///
/// # Examples
///
/// ```
/// use ship_ticket::extractors::rows::leading_digits;
///
/// assert_eq!(leading_digits("12 ea"), Some("12"));
/// assert_eq!(leading_digits("ea"), None);
/// ```
pub fn leading_digits(text: &str) -> Option<&str> {
    RE_LEADING_DIGITS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Assign the fragments under the header to columns, one record per row.
///
/// Only fragments more than `line_tolerance` below `header_y` take part.
/// Rows come out top to bottom; rows with fewer than `min_fields` populated
/// fields are discarded. A fragment outside every column is ignored.
pub fn group_rows(
    fragments: &[TextFragment],
    header_y: f32,
    columns: &[Column],
    config: &ExtractionConfig,
) -> Vec<RowRecord> {
    let mut by_y: BTreeMap<i64, Vec<&TextFragment>> = BTreeMap::new();
    for fragment in fragments
        .iter()
        .filter(|f| f.y < header_y - config.line_tolerance)
    {
        by_y.entry(fragment.y.round() as i64).or_default().push(fragment);
    }

    let mut rows = Vec::new();
    for (_, row_fragments) in by_y.iter().rev() {
        let mut record = RowRecord::new();
        for fragment in row_fragments {
            if let Some(column) = columns.iter().find(|c| c.contains(fragment.x)) {
                record.append(&column.name, &fragment.content);
            }
        }
        if record.populated_count() >= config.min_fields {
            rows.push(record);
        }
    }
    rows
}

/// Normalize grouped rows into final line items.
///
/// Every column is present in the output (empty when missing) and values are
/// trimmed. Rows with neither product nor description are dropped, the
/// quantity is reduced to its leading digit run, repeated
/// `(#, product, description)` keys are collapsed and stoplisted summary rows
/// removed.
pub fn normalize_rows(
    rows: Vec<RowRecord>,
    columns: &[Column],
    config: &ExtractionConfig,
) -> Vec<RowRecord> {
    let mut dedup = Deduplicator::new();
    let mut normalized = Vec::with_capacity(rows.len());

    for row in rows {
        let mut record = RowRecord::new();
        for column in columns {
            record.insert(column.name.clone(), row.get(&column.name).trim());
        }

        if record.product().is_empty() && record.description().is_empty() {
            continue;
        }

        if let Some(digits) = leading_digits(record.quantity()).map(str::to_string) {
            record.insert(QUANTITY_COLUMN, digits);
        }

        if dedup.admit(&record) {
            normalized.push(record);
        }
    }

    apply_stoplist(normalized, config)
}

/// Full positional path: group, then normalize.
pub fn extract_positional_rows(
    fragments: &[TextFragment],
    header_y: f32,
    columns: &[Column],
    config: &ExtractionConfig,
) -> Vec<RowRecord> {
    let grouped = group_rows(fragments, header_y, columns, config);
    log::debug!("Positional grouping produced {} candidate rows", grouped.len());
    normalize_rows(grouped, columns, config)
}

/// Remove rows whose product field contains a stoplist entry.
pub fn apply_stoplist(rows: Vec<RowRecord>, config: &ExtractionConfig) -> Vec<RowRecord> {
    let before = rows.len();
    let kept: Vec<RowRecord> = rows
        .into_iter()
        .filter(|row| !config.is_stoplisted(row.product()))
        .collect();
    if kept.len() < before {
        log::debug!("Stoplist removed {} summary rows", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::columns::map_columns;

    fn invoice_columns(config: &ExtractionConfig) -> Vec<Column> {
        map_columns(
            &[
                TextFragment::at("#", 40.0, 520.0),
                TextFragment::at("Product or service", 100.0, 520.0),
                TextFragment::at("Description", 250.0, 520.0),
                TextFragment::at("Qty", 400.0, 520.0),
            ],
            config,
        )
    }

    #[test]
    fn test_group_rows_top_to_bottom() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let fragments = vec![
            TextFragment::at("B-2", 105.0, 280.0),
            TextFragment::at("3", 405.0, 280.0),
            TextFragment::at("A-1", 105.0, 300.0),
            TextFragment::at("12", 405.0, 300.2),
        ];
        let rows = group_rows(&fragments, 520.0, &columns, &config);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product(), "A-1");
        assert_eq!(rows[1].product(), "B-2");
    }

    #[test]
    fn test_fragments_near_header_are_excluded() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let fragments = vec![
            TextFragment::at("A-1", 105.0, 516.0),
            TextFragment::at("12", 405.0, 516.0),
        ];
        assert!(group_rows(&fragments, 520.0, &columns, &config).is_empty());
    }

    #[test]
    fn test_wrapped_field_is_appended() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let fragments = vec![
            TextFragment::at("Blue", 255.0, 300.0),
            TextFragment::at("widget", 290.0, 300.0),
            TextFragment::at("A-1", 105.0, 300.0),
        ];
        let rows = group_rows(&fragments, 520.0, &columns, &config);
        assert_eq!(rows[0].description(), "Blue widget");
    }

    #[test]
    fn test_single_field_row_is_discarded() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let fragments = vec![TextFragment::at("Thank you", 105.0, 100.0)];
        assert!(group_rows(&fragments, 520.0, &columns, &config).is_empty());
    }

    #[test]
    fn test_normalize_quantity_and_dedup() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let rows = vec![
            RowRecord::from_pairs([("#", "1"), ("Product or service", "A-1"), ("Qty", "12 ea")]),
            RowRecord::from_pairs([("#", "1"), ("Product or service", "A-1"), ("Qty", "12 ea")]),
            RowRecord::from_pairs([("#", "2"), ("Qty", "4")]),
        ];
        let normalized = normalize_rows(rows, &columns, &config);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].quantity(), "12");
        assert_eq!(normalized[0].description(), "");
    }

    #[test]
    fn test_normalize_applies_stoplist() {
        let config = ExtractionConfig::default();
        let columns = invoice_columns(&config);
        let rows = vec![
            RowRecord::from_pairs([("Product or service", "Subtotal"), ("Qty", "450")]),
            RowRecord::from_pairs([("Product or service", "A-1"), ("Qty", "1")]),
        ];
        let normalized = normalize_rows(rows, &columns, &config);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].product(), "A-1");
    }
}
