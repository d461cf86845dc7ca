//! Core library for Chinese VAT invoice (fapiao) extraction.
//!
//! This crate provides:
//! - PDF glyph-run extraction with positions (lopdf)
//! - Reading-order reconstruction from positioned runs
//! - Item row, date and total extraction for fapiao layouts
//! - Invoice records with allocation batches
//! - A per-document pipeline and a concurrent batch driver

pub mod batch;
pub mod error;
pub mod invoice;
pub mod layout;
pub mod models;
pub mod pdf;
pub mod pipeline;

pub use batch::{process_documents, process_documents_with, DocumentOutcome, SourceDocument};
pub use error::{FapiaoError, PdfError, Result};
pub use invoice::{ExtractedFields, InvoiceExtractor, InvoiceFieldExtractor, ItemFields};
pub use layout::{LayoutReconstructor, PageText, TextRun};
pub use models::config::{ExtractionConfig, FapiaoConfig, LayoutConfig, PdfConfig};
pub use models::identity::{IdIssuer, RandomIds, SequentialIds};
pub use models::invoice::{Batch, Field, InvoiceRecord};
pub use pdf::{PdfExtractor, PdfProcessor, PreparedRuns};
pub use pipeline::DocumentPipeline;
