//! PDF processing module.

mod extractor;
mod prepared;
mod text_state;

pub use extractor::PdfExtractor;
pub use prepared::PreparedRuns;

use crate::error::PdfError;
use crate::layout::TextRun;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for sources of positioned page text.
///
/// Implementations differ only in where the runs come from: a live PDF
/// document or a buffer of runs read earlier.
pub trait PdfProcessor {
    /// Load a document from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the document.
    fn page_count(&self) -> u32;

    /// Positioned text runs of a page (1-indexed), in content-stream order.
    fn text_runs(&self, page: u32) -> Result<Vec<TextRun>>;
}
