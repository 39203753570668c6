//! Configuration for invoice extraction.
//!
//! Every heuristic threshold the extraction pipeline uses is a named field here
//! so it can be tuned per document family.

use serde::{Deserialize, Serialize};

use crate::template::TemplateLayout;

/// Default maximum vertical distance for two fragments to share a line.
pub const DEFAULT_LINE_TOLERANCE: f32 = 5.0;

/// Default horizontal slack subtracted from each header fragment's x.
pub const DEFAULT_COLUMN_PADDING: f32 = 5.0;

/// Canonical invoice column titles, in schema order.
pub const DEFAULT_TARGET_COLUMNS: [&str; 6] =
    ["#", "Product or service", "Description", "Qty", "Rate", "Amount"];

/// Invoice summary labels that look row-like but are not line items.
pub const DEFAULT_STOPLIST: [&str; 4] = ["Subtotal", "Discount", "Sales tax", "Payment"];

/// Literal markers that identify the header line on the lexical path.
pub const DEFAULT_HEADER_MARKERS: [&str; 2] = ["Product or service", "Description"];

/// Column holding the row number.
pub const ROW_NUMBER_COLUMN: &str = "#";
/// Column holding the product code.
pub const PRODUCT_COLUMN: &str = "Product or service";
/// Column holding the free-text description.
pub const DESCRIPTION_COLUMN: &str = "Description";
/// Column holding the ordered quantity.
pub const QUANTITY_COLUMN: &str = "Qty";

/// Extraction pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum vertical distance for fragments on the same visual line.
    pub line_tolerance: f32,

    /// Horizontal padding applied to the left edge of every column.
    pub column_padding: f32,

    /// Ordered column titles the header is matched against.
    pub target_columns: Vec<String>,

    /// Product-field substrings that mark summary rows.
    pub stoplist: Vec<String>,

    /// Markers that must all appear on the lexical header line.
    pub header_markers: Vec<String>,

    /// Minimum populated fields for a positional row to be kept.
    pub min_fields: usize,

    /// Minimum cell count for a tabular line to be kept in page tables.
    pub min_table_cells: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            column_padding: DEFAULT_COLUMN_PADDING,
            target_columns: DEFAULT_TARGET_COLUMNS.iter().map(|s| s.to_string()).collect(),
            stoplist: DEFAULT_STOPLIST.iter().map(|s| s.to_string()).collect(),
            header_markers: DEFAULT_HEADER_MARKERS.iter().map(|s| s.to_string()).collect(),
            min_fields: 2,
            min_table_cells: 3,
        }
    }

    /// Set the same-line tolerance.
    pub fn with_line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = tolerance;
        self
    }

    /// Set the column padding.
    pub fn with_column_padding(mut self, padding: f32) -> Self {
        self.column_padding = padding;
        self
    }

    /// Replace the target column titles.
    pub fn with_target_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the summary-row stoplist.
    pub fn with_stoplist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stoplist = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the lexical header markers.
    pub fn with_header_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Position of a title in the canonical schema, if configured.
    pub fn column_index(&self, title: &str) -> Option<usize> {
        self.target_columns.iter().position(|c| c == title)
    }

    /// Whether a product field matches any stoplist entry.
    pub fn is_stoplisted(&self, product: &str) -> bool {
        self.stoplist.iter().any(|entry| product.contains(entry.as_str()))
    }
}

/// Combined configuration file accepted by the command-line tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction heuristics
    pub extraction: ExtractionConfig,
    /// Destination template layout
    pub layout: TemplateLayout,
}

impl AppConfig {
    /// Parse a JSON configuration, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.layout.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.line_tolerance, 5.0);
        assert_eq!(config.column_padding, 5.0);
        assert_eq!(config.target_columns.len(), 6);
        assert_eq!(config.column_index("Qty"), Some(3));
        assert_eq!(config.column_index("Unit"), None);
    }

    #[test]
    fn test_stoplist_is_substring_match() {
        let config = ExtractionConfig::default();
        assert!(config.is_stoplisted("Subtotal"));
        assert!(config.is_stoplisted("Sales tax (8%)"));
        assert!(!config.is_stoplisted("WIDGET-1"));
    }

    #[test]
    fn test_builder() {
        let config = ExtractionConfig::new()
            .with_line_tolerance(2.5)
            .with_stoplist(["Total"]);
        assert_eq!(config.line_tolerance, 2.5);
        assert!(config.is_stoplisted("Total due"));
        assert!(!config.is_stoplisted("Subtotal"));
    }

    #[test]
    fn test_partial_json() {
        let config = AppConfig::from_json(
            r#"{"extraction": {"line_tolerance": 3.0}, "layout": {"data_end_row": 30, "signature_row": 31}}"#,
        )
        .unwrap();
        assert_eq!(config.extraction.line_tolerance, 3.0);
        assert_eq!(config.extraction.column_padding, 5.0);
        assert_eq!(config.layout.data_start_row, 9);
        assert_eq!(config.layout.data_end_row, 30);
    }

    #[test]
    fn test_json_rejects_bad_layout() {
        let result = AppConfig::from_json(r#"{"layout": {"data_end_row": 24, "signature_row": 24}}"#);
        assert!(result.is_err());
    }
}
