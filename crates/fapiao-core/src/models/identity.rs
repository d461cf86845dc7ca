//! Identity issuing for records and batches.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues identity tokens for records and batches.
pub trait IdIssuer: Send + Sync {
    /// Return a new, unused identifier.
    fn issue(&self) -> String;
}

/// Monotonic counter ids (`<prefix>-1`, `<prefix>-2`, ...).
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdIssuer for SequentialIds {
    fn issue(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Random UUID v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdIssuer for RandomIds {
    fn issue(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
