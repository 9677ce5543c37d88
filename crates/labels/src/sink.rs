//! Warning reporting capability.
//!
//! The parser reports grammar and bounding problems through an injected
//! sink instead of calling a logging subsystem directly, so it stays
//! testable with no logger attached.

use std::sync::Mutex;

/// Receives non-fatal warnings from the parser.
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing` at warn level.
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "labels", "{message}");
    }
}

/// Discards all warnings.
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&self, _message: &str) {}
}

/// Records warnings for later inspection.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl WarningSink for CollectingSink {
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
