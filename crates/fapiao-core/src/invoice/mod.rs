//! Invoice field extraction module.

mod parser;
pub mod rules;

pub use parser::{InvoiceFieldExtractor, RowSource};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::layout::PageText;

/// Fields recovered from the item row. `None` marks a field that was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFields {
    pub name: Option<String>,
    pub model: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

/// Everything the extractor recovered from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub item: ItemFields,
    pub invoice_date: Option<NaiveDate>,
    pub total_price: Option<Decimal>,
}

/// Trait for invoice field extractors.
///
/// Extraction never fails: missing fields come back as `None`.
pub trait InvoiceExtractor {
    /// Extract fields from reconstructed text and its positioned runs.
    fn extract(&self, page: &PageText) -> ExtractedFields;

    /// Extract fields from plain text, without geometry.
    fn extract_from_text(&self, text: &str) -> ExtractedFields {
        self.extract(&PageText {
            text: text.to_string(),
            runs: Vec::new(),
        })
    }
}
