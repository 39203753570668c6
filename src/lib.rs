// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # Ship Ticket
//!
//! Invoice line-item extraction and ship-ticket spreadsheet export.
//!
//! ## Core Features
//!
//! ### Extraction
//! - **Reading Order**: Top-to-bottom, left-to-right ordering with a line tolerance
//! - **Positional Tables**: Header location and column mapping by fragment geometry
//! - **Lexical Fallback**: Whitespace-split text lines when geometry is unusable
//! - **Tagged Outcomes**: Every result says which path produced it
//! - **Metadata**: Estimate number and date
//!
//! ### Export
//! - **Template Filling**: Line items written into a fixed data block
//! - **Row Insertion**: The data block grows and the signature block moves down
//!   with its merges and formatting intact
//! - **XLSX Codec**: Untouched package parts are copied byte for byte
//!
//! ## Quick Start
//!
//! ```
//! use ship_ticket::geometry::TextFragment;
//!
//! let page = vec![
//!     TextFragment::at("Product or service", 100.0, 520.0),
//!     TextFragment::at("Description", 250.0, 520.0),
//!     TextFragment::at("Qty", 400.0, 520.0),
//!     TextFragment::at("WIDGET-1", 105.0, 300.0),
//!     TextFragment::at("12", 405.0, 300.0),
//! ];
//!
//! let extraction = ship_ticket::extract(&[page]);
//! assert_eq!(extraction.products()[0].product(), "WIDGET-1");
//! assert_eq!(extraction.products()[0].quantity(), "12");
//! ```
//!
//! Exporting takes the template bytes, its layout and the selected records:
//!
//! ```no_run
//! use ship_ticket::template::TemplateLayout;
//!
//! # fn main() -> ship_ticket::Result<()> {
//! # let records = Vec::new();
//! let template = std::fs::read("ship-ticket-template.xlsx")?;
//! let output = ship_ticket::export_selected(&template, &TemplateLayout::default(), &records)?;
//! std::fs::write("ship-ticket.xlsx", output)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Positioned text
pub mod geometry;

// Reading order, lines and tabular lines
pub mod layout;

// Line-item and metadata extraction
pub mod extractors;

// Document queue
pub mod batch;

// Spreadsheet template export
pub mod template;

// Re-exports
pub use config::{AppConfig, ExtractionConfig};
pub use error::{Error, Result};
pub use extractors::{Extraction, ExtractionOutcome, InvoiceExtractor, RowRecord};
pub use template::{InsertionReport, TemplateLayout, TemplateRowEngine, XlsxTemplate};

use geometry::TextFragment;

/// Extract line items and metadata from a document's pages with the default
/// configuration.
pub fn extract(pages: &[Vec<TextFragment>]) -> Extraction {
    extract_with_config(pages, &ExtractionConfig::default())
}

/// Extract line items and metadata from a document's pages.
pub fn extract_with_config(pages: &[Vec<TextFragment>], config: &ExtractionConfig) -> Extraction {
    InvoiceExtractor::new(config.clone()).extract(pages)
}

/// Fill a template with the selected records and return the new workbook.
///
/// # Errors
///
/// - [`Error::EmptySelection`] when `records` is empty
/// - [`Error::TemplateLoad`] when `template` is not a readable workbook
/// - [`Error::MissingWorksheet`] when the workbook has no sheet
/// - [`Error::InvalidLayout`] when `layout` does not fit the template
pub fn export_selected(
    template: &[u8],
    layout: &TemplateLayout,
    records: &[RowRecord],
) -> Result<Vec<u8>> {
    export_selected_with_report(template, layout, records).map(|(bytes, _)| bytes)
}

/// Like [`export_selected`], also returning what the engine did.
pub fn export_selected_with_report(
    template: &[u8],
    layout: &TemplateLayout,
    records: &[RowRecord],
) -> Result<(Vec<u8>, InsertionReport)> {
    if records.is_empty() {
        return Err(Error::EmptySelection);
    }

    let mut workbook = XlsxTemplate::load(template)?;
    let report = TemplateRowEngine::new(*layout).fill(workbook.worksheet_mut(), records)?;
    if report.rows_inserted > 0 {
        workbook.discard_calc_chain();
    }
    for warning in &report.warnings {
        log::warn!("Export: {}", warning);
    }
    log::info!(
        "Exported {} records ({} rows inserted, signature at row {})",
        report.rows_written,
        report.rows_inserted,
        report.signature_row
    );

    Ok((workbook.to_bytes()?, report))
}

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all other values,
    /// so sorting by coordinate never panics on malformed input.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater, // NaN > all numbers
            (false, true) => Ordering::Less,    // all numbers < NaN
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is populated from CARGO_PKG_VERSION at compile time
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "ship_ticket");
    }

    #[test]
    fn test_export_rejects_empty_selection() {
        let result = export_selected(b"", &TemplateLayout::default(), &[]);
        assert!(matches!(result, Err(Error::EmptySelection)));
    }

    #[test]
    fn test_export_rejects_garbage_template() {
        let records = [RowRecord::from_pairs([("Product or service", "A")])];
        let result = export_selected(b"garbage", &TemplateLayout::default(), &records);
        assert!(matches!(result, Err(Error::TemplateLoad(_))));
    }
}
