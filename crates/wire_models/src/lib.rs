//! Wire models for the telemetry export core.
//!
//! Pure, stateless encoders producing the exact on-wire JSON for trace
//! samples, segment trees, and batched log events. The array-shaped parts
//! are consumed positionally by the collector, so field order is part of
//! the contract: any reordering is a breaking change.
//!
//! No I/O happens here; encoding a well-formed value cannot fail.

pub mod attributes;
pub mod events;
pub mod trace;

pub use attributes::AttributeValue;
pub use events::{encode_log_event_batch, LogEvent, LogEventBatch};
pub use trace::{encode_trace_sample, TraceSample, TraceSegment, TraceTree};

use thiserror::Error;

/// Error produced when a wire model cannot be serialized.
///
/// Unreachable for well-formed values: all wire model types are closed,
/// string-keyed, and contain only JSON-representable scalars. Kept as a
/// `Result` so callers propagate with `?` instead of panicking.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Serialization error from the underlying JSON writer.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
