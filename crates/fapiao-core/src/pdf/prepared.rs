//! Runs read ahead of time and stored as JSON.

use tracing::debug;

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::layout::TextRun;

/// A single-page source backed by a JSON array of runs.
///
/// Used to replay runs dumped by `fapiao layout --dump-runs`, or runs produced
/// by another renderer.
#[derive(Debug, Clone, Default)]
pub struct PreparedRuns {
    runs: Option<Vec<TextRun>>,
}

impl PreparedRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap runs that are already in memory.
    pub fn from_runs(runs: Vec<TextRun>) -> Self {
        Self { runs: Some(runs) }
    }
}

impl PdfProcessor for PreparedRuns {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let runs: Vec<TextRun> =
            serde_json::from_slice(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        debug!("Loaded {} prepared runs", runs.len());
        self.runs = Some(runs);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        u32::from(self.runs.is_some())
    }

    fn text_runs(&self, page: u32) -> Result<Vec<TextRun>> {
        match (&self.runs, page) {
            (None, _) => Err(PdfError::NoPages),
            (Some(runs), 1) => Ok(runs.clone()),
            (Some(_), other) => Err(PdfError::InvalidPage(other)),
        }
    }
}
