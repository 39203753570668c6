//! Spreadsheet template filling.
//!
//! A template is an `.xlsx` workbook whose first sheet has a fixed data block
//! followed by a signature block. [`TemplateRowEngine`] writes line items into
//! the data block, inserting rows and moving the signature block down when the
//! block is too small. [`XlsxTemplate`] loads and saves the package.

pub mod address;
pub mod engine;
pub mod layout;
pub mod model;
pub mod styles;
pub mod xlsx;

pub use engine::{InsertionReport, TemplateRowEngine};
pub use layout::TemplateLayout;
pub use model::{
    Alignment, Cell, CellStyle, CellValue, Formula, HorizontalAlignment, MergeError, MergeRegion,
    Protection, Row, VerticalAlignment, Worksheet,
};
pub use xlsx::XlsxTemplate;
