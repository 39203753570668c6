//! Error types for invoice extraction and template export.
//!
//! Only conditions that abort a call are errors. Degraded extraction and
//! rejected merge operations are reported through result values instead.

use crate::template::model::MergeError;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during extraction or export.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Template bytes are not a readable spreadsheet package
    #[error("Failed to load template: {0}")]
    TemplateLoad(String),

    /// The template workbook has no worksheet to fill
    #[error("Template contains no worksheet")]
    MissingWorksheet,

    /// Template layout is inconsistent with itself or with the template
    #[error("Invalid template layout: {0}")]
    InvalidLayout(String),

    /// Nothing was selected for export
    #[error("No rows selected for export")]
    EmptySelection,

    /// Merge topology rejected a merge or unmerge request
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// A queued document could not be read
    #[error("Failed to read document '{source_id}': {reason}")]
    Document {
        /// Identifier of the failing document
        source_id: String,
        /// Reason reported by the page source
        reason: String,
    },

    /// Malformed XML inside the spreadsheet package
    #[error("XML error: {0}")]
    Xml(String),

    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Zip(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::model::MergeRegion;

    #[test]
    fn test_template_load_error() {
        let err = Error::TemplateLoad("not a zip".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Failed to load template"));
        assert!(msg.contains("not a zip"));
    }

    #[test]
    fn test_missing_worksheet_error() {
        let msg = format!("{}", Error::MissingWorksheet);
        assert_eq!(msg, "Template contains no worksheet");
    }

    #[test]
    fn test_document_error() {
        let err = Error::Document {
            source_id: "invoice-17.pdf".to_string(),
            reason: "truncated".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("invoice-17.pdf"));
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn test_merge_error_conversion() {
        let err: Error = MergeError::NotMerged(MergeRegion::new(24, 1, 24, 3)).into();
        assert!(matches!(err, Error::Merge(_)));
        assert!(format!("{}", err).contains("A24:C24"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "template.xlsx");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
