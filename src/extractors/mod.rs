//! Line-item extraction from positioned invoice text.
//!
//! Provides header location, column mapping, positional and lexical row
//! extraction, metadata extraction and the pipeline that ties them together.

pub mod columns;
pub mod header;
pub mod invoice;
pub mod lexical;
pub mod metadata;
pub mod record;
pub mod rows;

pub use columns::{best_title, map_columns, Column, UNMATCHED_COLUMN_INDEX};
pub use header::{locate_header, HeaderMatch};
pub use invoice::{Extraction, ExtractionOutcome, InvoiceExtractor};
pub use lexical::extract_lexical_rows;
pub use metadata::{extract_estimate_info, EstimateInfo};
pub use record::{Deduplicator, RowRecord};
pub use rows::{apply_stoplist, extract_positional_rows};
