//! Row records and duplicate suppression.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{DESCRIPTION_COLUMN, PRODUCT_COLUMN, QUANTITY_COLUMN, ROW_NUMBER_COLUMN};

/// One extracted table row: column name to trimmed cell text.
///
/// Field order follows insertion order, which the extractors keep equal to
/// the canonical column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord {
    fields: IndexMap<String, String>,
}

impl RowRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use ship_ticket::extractors::RowRecord;
    ///
    /// let record = RowRecord::from_pairs([("Product or service", "WIDGET-1"), ("Qty", "12")]);
    /// assert_eq!(record.product(), "WIDGET-1");
    /// assert_eq!(record.populated_count(), 2);
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Append text to a field, separated by a space when the field is non-empty.
    pub fn append(&mut self, column: &str, text: &str) {
        match self.fields.get_mut(column) {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(text);
            },
            Some(existing) => existing.push_str(text),
            None => {
                self.fields.insert(column.to_string(), text.to_string());
            },
        }
    }

    /// Field value, or `""` when absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Iterate over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields with non-empty content.
    pub fn populated_count(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
    }

    /// Whether no field has content.
    pub fn is_empty(&self) -> bool {
        self.populated_count() == 0
    }

    /// The row number field.
    pub fn row_number(&self) -> &str {
        self.get(ROW_NUMBER_COLUMN)
    }

    /// The product code field.
    pub fn product(&self) -> &str {
        self.get(PRODUCT_COLUMN)
    }

    /// The description field.
    pub fn description(&self) -> &str {
        self.get(DESCRIPTION_COLUMN)
    }

    /// The quantity field.
    pub fn quantity(&self) -> &str {
        self.get(QUANTITY_COLUMN)
    }

    /// Composite key used to collapse repeated detections of one row.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.row_number().to_string(),
            self.product().to_string(),
            self.description().to_string(),
        )
    }
}

/// Drops rows whose `(#, product, description)` key was already seen.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<(String, String, String)>,
}

impl Deduplicator {
    /// Create an empty deduplicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a key is offered, false afterwards.
    pub fn admit(&mut self, record: &RowRecord) -> bool {
        self.seen.insert(record.dedup_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_joins_with_space() {
        let mut record = RowRecord::new();
        record.append("Description", "Blue");
        record.append("Description", "widget");
        assert_eq!(record.description(), "Blue widget");
    }

    #[test]
    fn test_missing_field_is_empty() {
        let record = RowRecord::from_pairs([("Qty", "3")]);
        assert_eq!(record.product(), "");
        assert_eq!(record.quantity(), "3");
    }

    #[test]
    fn test_populated_count_ignores_empty() {
        let record = RowRecord::from_pairs([("#", ""), ("Product or service", "A"), ("Qty", "1")]);
        assert_eq!(record.populated_count(), 2);
    }

    #[test]
    fn test_deduplicator() {
        let a = RowRecord::from_pairs([("#", "1"), ("Product or service", "A"), ("Qty", "1")]);
        let b = RowRecord::from_pairs([("#", "1"), ("Product or service", "A"), ("Qty", "9")]);
        let c = RowRecord::from_pairs([("#", "2"), ("Product or service", "A")]);

        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(&a));
        assert!(!dedup.admit(&b)); // quantity is not part of the key
        assert!(dedup.admit(&c));
    }

    #[test]
    fn test_serializes_as_object() {
        let record = RowRecord::from_pairs([("Product or service", "A"), ("Qty", "2")]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Product or service":"A","Qty":"2"}"#);
    }
}
