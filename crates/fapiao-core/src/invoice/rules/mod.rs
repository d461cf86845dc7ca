//! Rule-based field extractors for Chinese VAT invoices.

pub mod amounts;
pub mod anchor;
pub mod dates;
pub mod pairing;
pub mod patterns;
pub mod tokens;

pub use amounts::{extract_total_amount, parse_amount, TotalAmountExtractor};
pub use anchor::{AnchorExtractor, ItemAnchor};
pub use dates::{extract_invoice_date, DateExtractor};
pub use pairing::{pair_quantity_price, QuantityPrice};
pub use patterns::*;
pub use tokens::{Token, UnitTable};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value with the text it came from.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
