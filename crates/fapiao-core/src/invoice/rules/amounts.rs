//! Total amount extraction for Chinese invoices.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::TOTAL_AMOUNT;
use super::{ExtractionMatch, FieldExtractor};

/// Extractor for the "total including tax" amount.
///
/// Matches `价税合计` or `小写`, then the first decimal number that follows on
/// the same line, optionally prefixed with a currency glyph.
pub struct TotalAmountExtractor;

impl TotalAmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotalAmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TotalAmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in TOTAL_AMOUNT.captures_iter(text) {
            if let Some(amount) = parse_amount(&caps[1]) {
                let (start, end) = caps
                    .get(0)
                    .map(|m| (m.start(), m.end()))
                    .unwrap_or_default();
                results.push(ExtractionMatch::new(amount, &caps[0]).with_position(start, end));
            }
        }

        results
    }
}

/// Extract the total amount including tax.
pub fn extract_total_amount(text: &str) -> Option<Decimal> {
    TotalAmountExtractor::new().extract(text).map(|m| m.value)
}

/// Parse a plain decimal amount ("128.50", "128.", "-3").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s).ok()
}
