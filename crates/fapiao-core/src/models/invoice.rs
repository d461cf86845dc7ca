//! Invoice record produced for each parsed document.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::invoice::ExtractedFields;
use crate::models::config::ExtractionConfig;
use crate::models::identity::IdIssuer;

/// A normalized invoice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Identity token.
    pub id: String,

    /// Name of the source document (usually its file name).
    pub source_name: String,

    /// Item name including the `*category*` tag. Empty when no item row was found.
    pub item_name: String,

    /// Model / specification.
    pub model: String,

    /// Unit of measure.
    pub unit: String,

    /// Quantity.
    pub quantity: Decimal,

    /// Unit price.
    pub unit_price: Decimal,

    /// Total including tax, extracted independently of the item row.
    pub total_price: Decimal,

    /// Issue date.
    pub invoice_date: NaiveDate,

    /// Stock-out allocation of the quantity.
    pub batches: Vec<Batch>,

    /// Person keeping the material, filled in during review.
    #[serde(default)]
    pub keeper: String,

    /// Person signing for the material, filled in during review.
    #[serde(default)]
    pub signer: String,

    /// Fields that could not be extracted and were defaulted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<Field>,
}

/// Allocation of part of a record's quantity to an out-date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub out_date: NaiveDate,
    pub quantity: Decimal,
}

/// Extractable fields of an invoice record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ItemName,
    Model,
    Unit,
    Quantity,
    UnitPrice,
    TotalPrice,
    InvoiceDate,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ItemName => "item_name",
            Field::Model => "model",
            Field::Unit => "unit",
            Field::Quantity => "quantity",
            Field::UnitPrice => "unit_price",
            Field::TotalPrice => "total_price",
            Field::InvoiceDate => "invoice_date",
        }
    }
}

/// Tolerance used when comparing allocated and required quantities.
fn allocation_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

impl InvoiceRecord {
    /// Build a record from extracted fields, applying defaults for every gap.
    ///
    /// `fallback_date` is used when the page carries no issue date. The record
    /// starts with one batch that allocates the whole quantity on that date.
    pub fn assemble(
        fields: ExtractedFields,
        source_name: impl Into<String>,
        fallback_date: NaiveDate,
        config: &ExtractionConfig,
        ids: &dyn IdIssuer,
    ) -> Self {
        let mut gaps = Vec::new();
        let item = fields.item;

        let item_name = item.name.unwrap_or_else(|| {
            gaps.push(Field::ItemName);
            String::new()
        });
        let model = item.model.unwrap_or_else(|| {
            gaps.push(Field::Model);
            String::new()
        });
        let unit = item.unit.unwrap_or_else(|| {
            gaps.push(Field::Unit);
            config.default_unit.clone()
        });
        let quantity = item.quantity.unwrap_or_else(|| {
            gaps.push(Field::Quantity);
            Decimal::ZERO
        });
        let unit_price = item.unit_price.unwrap_or_else(|| {
            gaps.push(Field::UnitPrice);
            Decimal::ZERO
        });
        let total_price = fields.total_price.unwrap_or_else(|| {
            gaps.push(Field::TotalPrice);
            Decimal::ZERO
        });
        let invoice_date = fields.invoice_date.unwrap_or_else(|| {
            gaps.push(Field::InvoiceDate);
            fallback_date
        });

        let source_name = source_name.into();
        if gaps.contains(&Field::ItemName) {
            warn!("{}: no item row found, record needs manual completion", source_name);
        }

        Self {
            id: ids.issue(),
            source_name,
            item_name,
            model,
            unit,
            quantity,
            unit_price,
            total_price,
            invoice_date,
            batches: vec![Batch {
                id: ids.issue(),
                out_date: invoice_date,
                quantity,
            }],
            keeper: String::new(),
            signer: String::new(),
            gaps,
        }
    }

    /// Whether any field was defaulted.
    pub fn is_degraded(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// Item name for display, with a placeholder for unrecognised items.
    pub fn display_name<'a>(&'a self, config: &'a ExtractionConfig) -> &'a str {
        if self.item_name.is_empty() {
            &config.unrecognized_name
        } else {
            &self.item_name
        }
    }

    /// Sum of all batch quantities.
    pub fn allocated_quantity(&self) -> Decimal {
        self.batches.iter().map(|b| b.quantity).sum()
    }

    /// Whether the batches allocate exactly the record quantity.
    pub fn is_fully_allocated(&self) -> bool {
        (self.allocated_quantity() - self.quantity).abs() < allocation_tolerance()
    }

    /// Whether the record can be exported without further review.
    pub fn is_ready(&self) -> bool {
        self.is_fully_allocated() && !self.item_name.is_empty()
    }

    /// Append a batch dated on the invoice date holding the unallocated remainder.
    pub fn add_batch(&mut self, ids: &dyn IdIssuer) -> &Batch {
        let remaining = (self.quantity - self.allocated_quantity()).max(Decimal::ZERO);
        self.batches.push(Batch {
            id: ids.issue(),
            out_date: self.invoice_date,
            quantity: remaining,
        });
        &self.batches[self.batches.len() - 1]
    }

    /// Remove a batch by id. The last remaining batch is never removed.
    pub fn remove_batch(&mut self, id: &str) -> bool {
        if self.batches.len() <= 1 {
            return false;
        }
        let before = self.batches.len();
        self.batches.retain(|b| b.id != id);
        self.batches.len() != before
    }

    /// Validate the record and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.item_name.is_empty() {
            issues.push("Missing item name".to_string());
        }

        if self.quantity.is_zero() {
            issues.push("Quantity is zero".to_string());
        }

        if self.unit_price.is_zero() {
            issues.push("Unit price is zero".to_string());
        }

        if self.total_price.is_zero() {
            issues.push("Total price is zero".to_string());
        }

        if !self.is_fully_allocated() {
            issues.push(format!(
                "Batches allocate {} of {}",
                self.allocated_quantity(),
                self.quantity
            ));
        }

        for field in &self.gaps {
            issues.push(format!("Field not extracted: {}", field.as_str()));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ItemFields;
    use crate::models::identity::SequentialIds;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn full_fields() -> ExtractedFields {
        ExtractedFields {
            item: ItemFields {
                name: Some("*日用杂品*清洗剂".to_string()),
                model: Some("500ml".to_string()),
                unit: Some("瓶".to_string()),
                quantity: Some(Decimal::from(2)),
                unit_price: Some(Decimal::from_str("17.19").unwrap()),
            },
            invoice_date: Some(date(2025, 12, 12)),
            total_price: Some(Decimal::from_str("38.84").unwrap()),
        }
    }

    #[test]
    fn test_assemble_seeds_default_batch() {
        let ids = SequentialIds::new("t");
        let record = InvoiceRecord::assemble(
            full_fields(),
            "a.pdf",
            date(2026, 1, 1),
            &ExtractionConfig::default(),
            &ids,
        );

        assert_eq!(record.id, "t-1");
        assert_eq!(record.batches.len(), 1);
        assert_eq!(record.batches[0].id, "t-2");
        assert_eq!(record.batches[0].quantity, record.quantity);
        assert_eq!(record.batches[0].out_date, record.invoice_date);
        assert!(record.gaps.is_empty());
        assert!(record.is_ready());
    }

    #[test]
    fn test_assemble_degraded() {
        let ids = SequentialIds::default();
        let config = ExtractionConfig::default();
        let record = InvoiceRecord::assemble(
            ExtractedFields::default(),
            "blank.pdf",
            date(2026, 10, 19),
            &config,
            &ids,
        );

        assert_eq!(record.item_name, "");
        assert_eq!(record.display_name(&config), "未识别商品");
        assert_eq!(record.unit, "个");
        assert_eq!(record.quantity, Decimal::ZERO);
        assert_eq!(record.unit_price, Decimal::ZERO);
        assert_eq!(record.invoice_date, date(2026, 10, 19));
        assert_eq!(record.batches[0].out_date, date(2026, 10, 19));
        assert!(record.is_degraded());
        assert!(!record.is_ready());
        assert_eq!(
            record.gaps,
            vec![
                Field::ItemName,
                Field::Model,
                Field::Unit,
                Field::Quantity,
                Field::UnitPrice,
                Field::TotalPrice,
                Field::InvoiceDate,
            ]
        );
    }

    #[test]
    fn test_add_and_remove_batch() {
        let ids = SequentialIds::new("b");
        let mut record = InvoiceRecord::assemble(
            full_fields(),
            "a.pdf",
            date(2026, 1, 1),
            &ExtractionConfig::default(),
            &ids,
        );
        record.batches[0].quantity = Decimal::ONE;
        assert!(!record.is_fully_allocated());

        let added = record.add_batch(&ids).clone();
        assert_eq!(added.quantity, Decimal::ONE);
        assert_eq!(added.out_date, record.invoice_date);
        assert!(record.is_fully_allocated());

        assert!(record.remove_batch(&added.id));
        let only = record.batches[0].id.clone();
        assert!(!record.remove_batch(&only));
        assert_eq!(record.batches.len(), 1);
    }

    #[test]
    fn test_add_batch_never_negative() {
        let ids = SequentialIds::default();
        let mut record = InvoiceRecord::assemble(
            full_fields(),
            "a.pdf",
            date(2026, 1, 1),
            &ExtractionConfig::default(),
            &ids,
        );
        record.batches[0].quantity = Decimal::from(5);
        assert_eq!(record.add_batch(&ids).quantity, Decimal::ZERO);
    }

    #[test]
    fn test_validate_reports_allocation_mismatch() {
        let ids = SequentialIds::default();
        let mut record = InvoiceRecord::assemble(
            full_fields(),
            "a.pdf",
            date(2026, 1, 1),
            &ExtractionConfig::default(),
            &ids,
        );
        assert!(record.validate().is_empty());

        record.batches[0].quantity = Decimal::ONE;
        assert_eq!(record.validate(), vec!["Batches allocate 1 of 2".to_string()]);
    }

    #[test]
    fn test_serializes_iso_date() {
        let ids = SequentialIds::default();
        let record = InvoiceRecord::assemble(
            full_fields(),
            "a.pdf",
            date(2026, 1, 1),
            &ExtractionConfig::default(),
            &ids,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["invoice_date"], "2025-12-12");
        assert!(json.get("gaps").is_none());
    }
}
