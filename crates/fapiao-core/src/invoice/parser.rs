//! Item row, date and total extraction over reconstructed page text.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::layout::{PageText, TextRun};
use crate::models::config::{ExtractionConfig, LayoutConfig};

use super::rules::{
    extract_invoice_date, extract_total_amount, pair_quantity_price, AnchorExtractor,
    FieldExtractor, ItemAnchor, Token, UnitTable,
};
use super::{ExtractedFields, InvoiceExtractor, ItemFields};

/// Where the item row tokens came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    /// Runs sharing the anchor's baseline band.
    Geometry,
    /// Remainder of the anchor line in the reconstructed text.
    Text,
}

/// Rule-based extractor for Chinese VAT invoices.
pub struct InvoiceFieldExtractor {
    config: ExtractionConfig,
    row_y_tolerance: f32,
    units: UnitTable,
}

impl InvoiceFieldExtractor {
    /// Create an extractor from extraction and layout settings.
    pub fn new(config: ExtractionConfig, layout: &LayoutConfig) -> Self {
        let units = UnitTable::new(&config.units);
        Self {
            config,
            row_y_tolerance: layout.row_y_tolerance,
            units,
        }
    }

    /// Set the row tolerance used to collect runs around the anchor.
    pub fn with_row_tolerance(mut self, tolerance: f32) -> Self {
        self.row_y_tolerance = tolerance;
        self
    }

    /// Enable or disable the geometry-aware row lookup.
    pub fn with_geometry(mut self, enabled: bool) -> Self {
        self.config.prefer_geometry = enabled;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn product_tolerance(&self) -> Decimal {
        Decimal::try_from(self.config.product_tolerance).unwrap_or_else(|_| Decimal::new(5, 2))
    }

    /// Extract the item row fields.
    pub fn extract_item(&self, page: &PageText) -> ItemFields {
        self.extract_item_with_source(page).0
    }

    /// Extract the item row fields and report which row source was used.
    pub fn extract_item_with_source(&self, page: &PageText) -> (ItemFields, Option<RowSource>) {
        let Some(anchor) = AnchorExtractor::new().extract(&page.text) else {
            debug!("No *category*name anchor in page text");
            return (ItemFields::default(), None);
        };
        let anchor = anchor.value;

        if self.config.prefer_geometry {
            if let Some(row) = self.locate_row(&anchor, &page.runs) {
                let tokens = self.row_tokens(&anchor, &row);
                debug!("Item row from {} runs: {:?}", row.len(), tokens);
                return (self.reduce(&anchor, tokens), Some(RowSource::Geometry));
            }
            debug!("Anchor {:?} not found among runs, using text line", anchor.name);
        }

        let tokens = self.units.tokenize([anchor.remainder.as_str()]);
        debug!("Item row from text: {:?}", tokens);
        (self.reduce(&anchor, tokens), Some(RowSource::Text))
    }

    /// Runs on the anchor's row, sorted left to right.
    fn locate_row<'a>(&self, anchor: &ItemAnchor, runs: &'a [TextRun]) -> Option<Vec<&'a TextRun>> {
        let probe = anchor.probe(self.config.anchor_probe_chars);
        let anchor_run = runs.iter().find(|r| r.text.contains(&probe))?;
        let anchor_y = anchor_run.y;

        let mut row: Vec<&TextRun> = runs
            .iter()
            .filter(|r| (r.y - anchor_y).abs() < self.row_y_tolerance)
            .collect();
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        Some(row)
    }

    /// Classify row runs, dropping text that belongs to the item name.
    fn row_tokens(&self, anchor: &ItemAnchor, row: &[&TextRun]) -> Vec<Token> {
        self.units
            .tokenize(row.iter().map(|r| r.text.as_str()))
            .into_iter()
            .filter(|token| match token {
                Token::Number(_) => true,
                Token::TaxRate(s) | Token::TaxExempt(s) | Token::Unit(s) | Token::Text(s) => {
                    !anchor.name.contains(s.as_str())
                }
            })
            .collect()
    }

    /// Reduce classified tokens into item fields.
    fn reduce(&self, anchor: &ItemAnchor, tokens: Vec<Token>) -> ItemFields {
        let numbers: Vec<Decimal> = tokens.iter().filter_map(Token::as_number).collect();
        let pair = pair_quantity_price(&numbers, self.product_tolerance());

        let mut unit = None;
        let mut model_parts = Vec::new();
        for token in tokens {
            match token {
                // Only the first unit is the unit; later ones read as model text.
                Token::Unit(u) if unit.is_none() => unit = Some(u),
                Token::Unit(u) => model_parts.push(u),
                Token::Text(t) => model_parts.push(t),
                Token::Number(_) | Token::TaxRate(_) | Token::TaxExempt(_) => {}
            }
        }

        ItemFields {
            name: Some(anchor.name.clone()),
            model: if model_parts.is_empty() {
                None
            } else {
                Some(model_parts.join(" "))
            },
            unit,
            quantity: pair.quantity,
            unit_price: pair.unit_price,
        }
    }
}

impl Default for InvoiceFieldExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default(), &LayoutConfig::default())
    }
}

impl InvoiceExtractor for InvoiceFieldExtractor {
    fn extract(&self, page: &PageText) -> ExtractedFields {
        let (item, source) = self.extract_item_with_source(page);
        let invoice_date = extract_invoice_date(&page.text);
        let total_price = extract_total_amount(&page.text);

        info!(
            "Extracted item {:?} (row from {:?}), date {:?}, total {:?}",
            item.name, source, invoice_date, total_price
        );

        ExtractedFields {
            item,
            invoice_date,
            total_price,
        }
    }
}
