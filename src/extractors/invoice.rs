//! Invoice extraction pipeline.
//!
//! Drives one document's pages through reading order, line assembly, header
//! location, column mapping and row extraction, falling back to the lexical
//! path and finally to raw text.

use serde::Serialize;

use crate::config::ExtractionConfig;
use crate::extractors::columns::map_columns;
use crate::extractors::header::locate_header;
use crate::extractors::lexical::extract_lexical_rows;
use crate::extractors::metadata::{extract_estimate_info, EstimateInfo};
use crate::extractors::record::RowRecord;
use crate::extractors::rows::extract_positional_rows;
use crate::geometry::TextFragment;
use crate::layout::{assemble_lines, detect_table_lines, sort_fragments};

/// Which extraction path produced the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", content = "data", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Geometry-based extraction found a header and rows
    Positional(Vec<RowRecord>),
    /// Positional extraction failed; whitespace-split text lines succeeded
    Lexical(Vec<RowRecord>),
    /// Neither path produced rows; carries the assembled text
    RawText(String),
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// Line items, tagged with the path that produced them
    pub outcome: ExtractionOutcome,
    /// Estimate number and date
    pub metadata: EstimateInfo,
    /// Tabular-looking lines, one list per page that had any
    pub tables: Vec<Vec<Vec<String>>>,
    /// Assembled text of all pages
    pub text: String,
}

impl Extraction {
    /// Extracted line items; empty for a raw-text outcome.
    pub fn products(&self) -> &[RowRecord] {
        match &self.outcome {
            ExtractionOutcome::Positional(rows) | ExtractionOutcome::Lexical(rows) => rows,
            ExtractionOutcome::RawText(_) => &[],
        }
    }

    /// Whether the positional path did not produce the result.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.outcome, ExtractionOutcome::Positional(_))
    }
}

/// Stateless invoice extractor.
#[derive(Debug, Clone, Default)]
pub struct InvoiceExtractor {
    config: ExtractionConfig,
}

impl InvoiceExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract line items and metadata from a document's pages.
    ///
    /// Pages are processed in order and their lines and fragments
    /// concatenated. The call is a pure function of its input.
    pub fn extract(&self, pages: &[Vec<TextFragment>]) -> Extraction {
        let config = &self.config;
        let mut text = String::new();
        let mut fragments: Vec<TextFragment> = Vec::new();
        let mut tables = Vec::new();

        for (page_index, page) in pages.iter().enumerate() {
            let ordered = sort_fragments(page, config.line_tolerance);
            let lines = assemble_lines(&ordered, config.line_tolerance);
            log::debug!(
                "Page {}: {} fragments, {} lines",
                page_index + 1,
                page.len(),
                lines.len()
            );

            for line in &lines {
                text.push_str(&line.text);
                text.push('\n');
            }
            text.push('\n');

            let page_table = detect_table_lines(&lines, config.min_table_cells);
            if !page_table.is_empty() {
                tables.push(page_table);
            }

            fragments.extend(lines.into_iter().flat_map(|line| line.fragments));
        }

        let metadata = extract_estimate_info(&text);
        let outcome = self.extract_rows(&fragments, &text);

        Extraction {
            outcome,
            metadata,
            tables,
            text,
        }
    }

    fn extract_rows(&self, fragments: &[TextFragment], text: &str) -> ExtractionOutcome {
        let config = &self.config;

        let header = locate_header(fragments, config);
        if let (true, Some(header_y)) = (header.is_found(), header.y) {
            let columns = map_columns(&header.items, config);
            let rows = extract_positional_rows(fragments, header_y, &columns, config);
            if !rows.is_empty() {
                log::info!("Positional extraction produced {} rows", rows.len());
                return ExtractionOutcome::Positional(rows);
            }
            log::warn!("Header found at y={} but no rows; falling back to text", header_y);
        } else {
            log::warn!("No table header found; falling back to text");
        }

        let rows = extract_lexical_rows(text, config);
        if !rows.is_empty() {
            log::info!("Lexical extraction produced {} rows", rows.len());
            return ExtractionOutcome::Lexical(rows);
        }

        log::warn!("No line items found; returning raw text");
        ExtractionOutcome::RawText(text.to_string())
    }
}
