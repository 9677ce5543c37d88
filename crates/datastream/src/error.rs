//! Error taxonomy for the streaming transport.
//!
//! Low-level network errors are translated at the transport boundary into
//! this small closed set; callers never inspect raw library errors.

use std::fmt;
use thiserror::Error;

/// Why the server refused to establish the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Server-side throttling or backpressure; retry after a delay.
    Throttled,
    /// Credentials refused; retrying cannot succeed.
    Unauthenticated,
    /// Any other transport-level rejection.
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throttled => f.write_str("throttled"),
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

/// Errors establishing the duplex stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// No channel handle was supplied. A precondition failure, reported
    /// immediately and never retried inside the transport.
    #[error("no channel available")]
    ChannelUnavailable,

    /// The handshake did not complete within the connect timeout.
    #[error("connect deadline exceeded")]
    DeadlineExceeded,

    /// The server refused the stream.
    #[error("server rejected the stream: {0}")]
    Rejected(RejectReason),

    /// The cancellation signal fired before the stream was established.
    #[error("connect cancelled")]
    Cancelled,
}

impl ConnectError {
    /// Returns `true` for permanent conditions that stop automatic retry.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Rejected(RejectReason::Unauthenticated))
    }

    /// Returns `true` when the server signalled backpressure.
    #[inline]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Rejected(RejectReason::Throttled))
    }
}

/// Errors on an established stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The underlying connection reset or dropped mid-stream.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The stream, or the half needed for this operation, is closed.
    #[error("stream is closed")]
    Closed,

    /// A per-operation timeout elapsed.
    #[error("stream operation timed out")]
    Timeout,

    /// The cancellation signal fired during the operation.
    #[error("stream operation cancelled")]
    Cancelled,
}

impl StreamError {
    /// Cancellation drains the stream instead of failing it.
    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this error ends the owning transport instance.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_cancellation()
    }
}

/// Terminal outcome of exporting one batch through the coordinator.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The collector rejected the batch (or the credentials) permanently.
    #[error("fatal rejection: {reason}")]
    Fatal { reason: String },

    /// All connection attempts exhausted; the caller owns any further
    /// background retry cadence.
    #[error("all export attempts exhausted after {attempts} tries")]
    RetriesExhausted { attempts: u32 },

    /// Cancellation observed while exporting.
    #[error("export cancelled")]
    Cancelled,
}
