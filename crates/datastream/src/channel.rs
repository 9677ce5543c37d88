//! The duplex channel seam.
//!
//! Rather than one concrete type per payload kind, the transport is
//! generic over a `(request, response)` pair behind these traits. Each
//! concrete payload kind (spans, span batches) is a thin instantiation,
//! not a new state machine. Implementations wrap whatever wire library the
//! process links; the transport only sees the classified errors from
//! [`crate::error`].

use crate::error::{ConnectError, StreamError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ordered, opaque headers attached when the stream is opened
/// (authentication token, licensing key, connection metadata).
///
/// The transport never interprets these; they belong to the caller and the
/// channel implementation.
#[derive(Debug, Clone, Default)]
pub struct ConnectMetadata {
    entries: Vec<(String, String)>,
}

impl ConnectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Send half of a duplex stream.
///
/// Uses native async fn in traits; the `+ Send` bound on the returned
/// futures keeps implementations usable from multi-threaded runtimes.
pub trait DuplexSend<Req>: Send {
    /// Sends one encoded payload. Must not wait on the receive path.
    fn send(&mut self, item: Req) -> impl Future<Output = Result<(), StreamError>> + Send;

    /// Half-closes the send side, signalling end of requests to the peer.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}

/// Receive half of a duplex stream.
pub trait DuplexRecv<Res>: Send {
    /// Receives the next response. `None` means the peer completed the
    /// response stream.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Res, StreamError>>> + Send;
}

/// Factory for duplex streams to one collector endpoint.
pub trait DuplexChannel<Req, Res>: Send + Sync {
    type Tx: DuplexSend<Req>;
    type Rx: DuplexRecv<Res>;

    /// Opens a duplex stream.
    ///
    /// Implementations should honor `connect_timeout` and `cancel` where
    /// the underlying library allows; the transport enforces both
    /// regardless, so a slow implementation is bounded either way.
    fn open(
        &self,
        headers: &ConnectMetadata,
        connect_timeout: Duration,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(Self::Tx, Self::Rx), ConnectError>> + Send;
}
