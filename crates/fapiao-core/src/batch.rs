//! Concurrent processing of several documents.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::error::{FapiaoError, Result};
use crate::models::invoice::InvoiceRecord;
use crate::pdf::{PdfExtractor, PdfProcessor};
use crate::pipeline::DocumentPipeline;

/// A document waiting to be processed.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Name used in records and error reports.
    pub name: String,
    /// Raw document bytes.
    pub data: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Result for one document of a batch.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub source_name: String,
    pub result: Result<InvoiceRecord>,
}

impl DocumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Process PDFs concurrently; outcomes come back in input order.
pub async fn process_documents(
    pipeline: Arc<DocumentPipeline>,
    documents: Vec<SourceDocument>,
    fallback_date: NaiveDate,
) -> Vec<DocumentOutcome> {
    let pdf = pipeline.config().pdf.clone();
    process_documents_with(
        pipeline,
        documents,
        fallback_date,
        move || PdfExtractor::with_config(pdf.clone()),
        |_| {},
    )
    .await
}

/// Process documents concurrently with processors from `make_processor`.
///
/// Every document runs on the blocking pool. Handles are awaited in input
/// order, so `on_outcome` sees documents (and the returned list holds them) in
/// the order given, whatever order they finish in. A failed or panicked task
/// only affects its own outcome.
pub async fn process_documents_with<F, P>(
    pipeline: Arc<DocumentPipeline>,
    documents: Vec<SourceDocument>,
    fallback_date: NaiveDate,
    make_processor: F,
    mut on_outcome: impl FnMut(&DocumentOutcome),
) -> Vec<DocumentOutcome>
where
    F: Fn() -> P + Send + Sync + 'static,
    P: PdfProcessor,
{
    let make_processor = Arc::new(make_processor);

    let handles: Vec<(String, JoinHandle<Result<InvoiceRecord>>)> = documents
        .into_iter()
        .map(|doc| {
            let pipeline = Arc::clone(&pipeline);
            let make_processor = Arc::clone(&make_processor);
            let name = doc.name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let mut processor = make_processor();
                pipeline.process_with(&mut processor, &doc.name, &doc.data, fallback_date)
            });
            (name, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (source_name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("{}: task failed: {}", source_name, e);
                Err(FapiaoError::TaskAborted(source_name.clone()))
            }
        };
        if let Err(e) = &result {
            warn!("{}", e);
        }

        let outcome = DocumentOutcome {
            source_name,
            result,
        };
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    outcomes
}
