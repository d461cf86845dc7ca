//! Error types for the fapiao-core library.

use thiserror::Error;

/// Main error type for the fapiao library.
///
/// Only document-level failures are errors. A field that cannot be found on a
/// page is not an error: it is recorded in [`InvoiceRecord::gaps`](crate::InvoiceRecord).
#[derive(Error, Debug)]
pub enum FapiaoError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// A document could not be read; carries the source name for reporting.
    #[error("{source_name}: {error}")]
    Document {
        source_name: String,
        #[source]
        error: Box<FapiaoError>,
    },

    /// A per-document task stopped without producing a result.
    #[error("task for {0} did not complete")]
    TaskAborted(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FapiaoError {
    /// Attach the source document name to an error.
    pub fn for_document(source_name: impl Into<String>, error: impl Into<FapiaoError>) -> Self {
        FapiaoError::Document {
            source_name: source_name.into(),
            error: Box::new(error.into()),
        }
    }

    /// Name of the document this error belongs to, if known.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            FapiaoError::Document { source_name, .. } => Some(source_name),
            FapiaoError::TaskAborted(name) => Some(name),
            _ => None,
        }
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to decode a page content stream.
    #[error("failed to decode page content: {0}")]
    Content(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Result type for the fapiao library.
pub type Result<T> = std::result::Result<T, FapiaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_keeps_source_name() {
        let err = FapiaoError::for_document("a.pdf", PdfError::NoPages);
        assert_eq!(err.source_name(), Some("a.pdf"));
        assert_eq!(err.to_string(), "a.pdf: PDF error: PDF has no pages");
    }

    #[test]
    fn test_plain_error_has_no_source_name() {
        let err = FapiaoError::Config("bad".to_string());
        assert!(err.source_name().is_none());
    }
}
