//! Layout analysis for positioned text.
//!
//! This module turns a page's unordered fragments into reading order and
//! logical lines, and classifies lines that look like table rows:
//! - Reading order with a same-line tolerance
//! - Line assembly
//! - Lexical table-row detection

pub mod lines;
pub mod reading_order;
pub mod table_detector;

// Re-export main types
pub use lines::{assemble_lines, TextLine};
pub use reading_order::{reading_order_cmp, sort_fragments};
pub use table_detector::{detect_table_lines, is_table_row, split_cells};
