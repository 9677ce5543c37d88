//! Telemetry streaming transport.
//!
//! A resilient duplex-streaming client for shipping encoded telemetry
//! payloads to a remote collector over a long-lived bidirectional
//! connection, without losing or duplicating data across partial failures:
//!
//! - [`StreamingTransport`] owns one connection's lifecycle: connect
//!   bounded by a timeout, concurrent send/receive against the same duplex
//!   stream, classified failure, cancellation into a bounded drain.
//! - [`ExportCoordinator`] builds a fresh transport per attempt, applies
//!   exponential backoff with jitter, and reports exactly one terminal or
//!   retryable outcome per batch.
//! - The [`channel`] traits keep the wire library out of this crate: each
//!   payload kind is a thin instantiation of the same state machine.

pub mod channel;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod transport;

// Re-export main types
pub use channel::{ConnectMetadata, DuplexChannel, DuplexRecv, DuplexSend};
pub use coordinator::{
    BackoffConfig, ExportCoordinator, ExportMetrics, ResponseClassifier, ResponseOutcome,
};
pub use error::{ConnectError, ExportError, RejectReason, StreamError};
pub use state::{ConnectionState, FailReason};
pub use transport::{StreamingTransport, TransportConfig};
