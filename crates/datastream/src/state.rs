//! Connection lifecycle state.

use crate::error::{ConnectError, StreamError};
use thiserror::Error;

/// Lifecycle of one logical duplex connection.
///
/// Owned exclusively by the transport instance; a new connection means a
/// new instance with a fresh state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No stream; `open` has not been called.
    Disconnected,
    /// Handshake in progress, bounded by the connect timeout.
    Connecting,
    /// Duplex stream established; send and receive are live.
    Streaming,
    /// Closing down; in-flight work gets the grace period to finish.
    Draining,
    /// Unrecoverable; terminal for this instance. Recovery means building
    /// a new instance.
    Failed(FailReason),
}

impl ConnectionState {
    /// Returns `true` once the instance can never stream again.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Why a transport instance failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailReason {
    #[error("connect failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("stream failed: {0}")]
    Stream(#[from] StreamError),
}
