//! Per-document pipeline: page runs, reading order, fields, record.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{FapiaoError, Result};
use crate::invoice::{InvoiceExtractor, InvoiceFieldExtractor};
use crate::layout::{LayoutReconstructor, PageText, TextRun};
use crate::models::config::FapiaoConfig;
use crate::models::identity::{IdIssuer, RandomIds};
use crate::models::invoice::InvoiceRecord;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Runs one document from bytes (or runs) to an [`InvoiceRecord`].
///
/// The pipeline holds no per-document state and can be shared across threads.
pub struct DocumentPipeline {
    config: FapiaoConfig,
    reconstructor: LayoutReconstructor,
    extractor: InvoiceFieldExtractor,
    ids: Arc<dyn IdIssuer>,
}

impl DocumentPipeline {
    /// Create a pipeline issuing random ids.
    pub fn new(config: FapiaoConfig) -> Self {
        let reconstructor = LayoutReconstructor::new(config.layout.clone());
        let extractor = InvoiceFieldExtractor::new(config.extraction.clone(), &config.layout);
        Self {
            config,
            reconstructor,
            extractor,
            ids: Arc::new(RandomIds),
        }
    }

    /// Replace the id issuer.
    pub fn with_ids(mut self, ids: Arc<dyn IdIssuer>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &FapiaoConfig {
        &self.config
    }

    pub fn ids(&self) -> &dyn IdIssuer {
        self.ids.as_ref()
    }

    /// Load a document into `processor` and read the configured page.
    pub fn read_runs<P: PdfProcessor + ?Sized>(
        &self,
        processor: &mut P,
        data: &[u8],
    ) -> Result<Vec<TextRun>> {
        processor.load(data)?;
        let runs = processor.text_runs(self.config.pdf.page)?;
        debug!("Read {} runs from page {}", runs.len(), self.config.pdf.page);
        Ok(runs)
    }

    /// Reconstruct reading order without extracting fields.
    pub fn layout(&self, runs: &[TextRun]) -> PageText {
        self.reconstructor.reconstruct(runs)
    }

    /// Build a record from runs that were already read.
    pub fn process_runs(
        &self,
        source_name: &str,
        runs: &[TextRun],
        fallback_date: NaiveDate,
    ) -> InvoiceRecord {
        let page = self.reconstructor.reconstruct(runs);
        let fields = self.extractor.extract(&page);
        let record = InvoiceRecord::assemble(
            fields,
            source_name,
            fallback_date,
            &self.config.extraction,
            self.ids.as_ref(),
        );

        info!(
            "{}: {} x {} @ {} ({} gaps)",
            source_name,
            record.display_name(&self.config.extraction),
            record.quantity,
            record.unit_price,
            record.gaps.len()
        );
        record
    }

    /// Read a document with `processor` and build its record.
    ///
    /// Read failures carry `source_name`.
    pub fn process_with<P: PdfProcessor + ?Sized>(
        &self,
        processor: &mut P,
        source_name: &str,
        data: &[u8],
        fallback_date: NaiveDate,
    ) -> Result<InvoiceRecord> {
        let runs = self
            .read_runs(processor, data)
            .map_err(|e| FapiaoError::for_document(source_name, e))?;
        Ok(self.process_runs(source_name, &runs, fallback_date))
    }

    /// Read a PDF and build its record.
    pub fn process_pdf(
        &self,
        source_name: &str,
        data: &[u8],
        fallback_date: NaiveDate,
    ) -> Result<InvoiceRecord> {
        let mut extractor = PdfExtractor::with_config(self.config.pdf.clone());
        self.process_with(&mut extractor, source_name, data, fallback_date)
    }
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new(FapiaoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::models::identity::SequentialIds;
    use crate::pdf::PreparedRuns;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn pipeline() -> DocumentPipeline {
        DocumentPipeline::default().with_ids(Arc::new(SequentialIds::new("t")))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn invoice_runs() -> Vec<TextRun> {
        vec![
            TextRun::new("开票日期：2025年12月12日", 380.0, 520.0, 120.0, 9.0),
            TextRun::new("*日用杂品*清洗剂", 20.0, 400.0, 80.0, 9.0),
            TextRun::new("500ml", 140.0, 400.0, 30.0, 9.0),
            TextRun::new("瓶", 200.0, 400.0, 9.0, 9.0),
            TextRun::new("2", 240.0, 400.0, 6.0, 9.0),
            TextRun::new("17.19", 280.0, 400.0, 25.0, 9.0),
            TextRun::new("34.38", 340.0, 400.0, 25.0, 9.0),
            TextRun::new("13%", 390.0, 400.0, 15.0, 9.0),
            TextRun::new("4.47", 420.0, 400.0, 20.0, 9.0),
            TextRun::new("价税合计（大写）", 20.0, 300.0, 70.0, 9.0),
            TextRun::new("（小写）¥38.84", 380.0, 300.0, 60.0, 9.0),
        ]
    }

    #[test]
    fn test_process_runs() {
        let record = pipeline().process_runs("a.pdf", &invoice_runs(), today());

        assert_eq!(record.id, "t-1");
        assert_eq!(record.source_name, "a.pdf");
        assert_eq!(record.item_name, "*日用杂品*清洗剂");
        assert_eq!(record.model, "500ml");
        assert_eq!(record.unit, "瓶");
        assert_eq!(record.quantity, Decimal::from(2));
        assert_eq!(record.unit_price, Decimal::new(1719, 2));
        assert_eq!(record.total_price, Decimal::new(3884, 2));
        assert_eq!(record.invoice_date, NaiveDate::from_ymd_opt(2025, 12, 12).unwrap());
        assert_eq!(record.batches.len(), 1);
        assert_eq!(record.batches[0].id, "t-2");
        assert!(record.gaps.is_empty());
    }

    #[test]
    fn test_degraded_record_uses_fallback_date() {
        let runs = vec![TextRun::new("合计", 20.0, 300.0, 20.0, 9.0)];
        let record = pipeline().process_runs("blank.pdf", &runs, today());

        assert_eq!(record.item_name, "");
        assert_eq!(record.quantity, Decimal::ZERO);
        assert_eq!(record.unit_price, Decimal::ZERO);
        assert_eq!(record.invoice_date, today());
        assert_eq!(record.batches[0].out_date, today());
        assert!(record.is_degraded());
    }

    #[test]
    fn test_process_with_prepared_runs() {
        let json = serde_json::to_vec(&invoice_runs()).unwrap();
        let mut source = PreparedRuns::new();

        let record = pipeline()
            .process_with(&mut source, "runs.json", &json, today())
            .unwrap();
        assert_eq!(record.item_name, "*日用杂品*清洗剂");
    }

    #[test]
    fn test_read_failure_carries_source_name() {
        let err = pipeline()
            .process_pdf("broken.pdf", b"%PDF-garbage", today())
            .unwrap_err();

        assert_eq!(err.source_name(), Some("broken.pdf"));
        assert!(matches!(
            err,
            FapiaoError::Document { ref error, .. } if matches!(**error, FapiaoError::Pdf(PdfError::Parse(_)))
        ));
    }
}
