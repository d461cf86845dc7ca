//! Issue date extraction for Chinese invoices.

use chrono::NaiveDate;

use super::patterns::ISSUE_DATE_CN;
use super::{ExtractionMatch, FieldExtractor};

/// Long-form date extractor (`2025年12月12日`).
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in ISSUE_DATE_CN.captures_iter(text) {
            let (Ok(year), Ok(month), Ok(day)) = (
                caps[1].parse::<i32>(),
                caps[2].parse::<u32>(),
                caps[3].parse::<u32>(),
            ) else {
                continue;
            };

            // Calendar-invalid dates (month 13, Feb 30) are skipped.
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let full_match = &caps[0];
                let (start, end) = caps
                    .get(0)
                    .map(|m| (m.start(), m.end()))
                    .unwrap_or_default();
                results.push(ExtractionMatch::new(date, full_match).with_position(start, end));
            }
        }

        results
    }
}

/// Extract the invoice issue date from page text.
///
/// Returns `None` when the page carries no date; the caller decides the fallback.
pub fn extract_invoice_date(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().extract(text).map(|m| m.value)
}
