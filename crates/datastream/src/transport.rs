//! Streaming transport manager.
//!
//! One instance owns one logical duplex stream to one collector endpoint
//! for one payload kind:
//!
//! ```text
//! Disconnected → Connecting → Streaming → Draining → Disconnected
//!                     │            │
//!                     └────────────┴──────────────→ Failed(reason)
//! ```
//!
//! `Failed` is terminal: the instance never self-heals. The export
//! coordinator builds a fresh instance and retries with backoff.
//!
//! Send and receive run against independent halves behind separate async
//! locks, so a send never blocks on a receive. Lifecycle calls (`open`,
//! `close`) must be serialized by the caller; send/recv may overlap each
//! other freely.

use crate::channel::{ConnectMetadata, DuplexChannel, DuplexRecv, DuplexSend};
use crate::error::{ConnectError, StreamError};
use crate::state::{ConnectionState, FailReason};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Timeouts and drain behavior for one transport instance.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on the duplex handshake.
    pub connect_timeout: Duration,
    /// Optional per-send bound; `None` relies on cancellation only.
    pub send_timeout: Option<Duration>,
    /// Optional per-receive bound; `None` relies on cancellation only.
    pub recv_timeout: Option<Duration>,
    /// How long `close` waits for in-flight work before forcing unwind.
    pub grace_period: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            send_timeout: None,
            recv_timeout: None,
            grace_period: Duration::from_secs(3),
        }
    }
}

impl TransportConfig {
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit;
        self
    }

    pub fn with_send_timeout(mut self, limit: Duration) -> Self {
        self.send_timeout = Some(limit);
        self
    }

    pub fn with_recv_timeout(mut self, limit: Duration) -> Self {
        self.recv_timeout = Some(limit);
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}

/// Owns the lifecycle of one duplex stream.
///
/// Generic over the channel implementation and its `(request, response)`
/// payload pair.
pub struct StreamingTransport<C, Req, Res>
where
    C: DuplexChannel<Req, Res>,
{
    channel: Option<Arc<C>>,
    headers: ConnectMetadata,
    config: TransportConfig,
    /// Transport-scoped child of the caller's token: the caller's cancel
    /// propagates in, `close` never cancels the caller's token.
    cancel: CancellationToken,
    state: Mutex<ConnectionState>,
    tx: tokio::sync::Mutex<Option<C::Tx>>,
    rx: tokio::sync::Mutex<Option<C::Rx>>,
}

impl<C, Req, Res> StreamingTransport<C, Req, Res>
where
    C: DuplexChannel<Req, Res>,
{
    /// Creates a disconnected transport.
    ///
    /// `channel` may be absent; `open` then reports
    /// [`ConnectError::ChannelUnavailable`] immediately.
    pub fn new(
        channel: Option<Arc<C>>,
        headers: ConnectMetadata,
        config: TransportConfig,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            channel,
            headers,
            config,
            cancel: cancel.child_token(),
            state: Mutex::new(ConnectionState::Disconnected),
            tx: tokio::sync::Mutex::new(None),
            rx: tokio::sync::Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state(), ConnectionState::Streaming)
    }

    pub fn is_failed(&self) -> bool {
        self.state().is_terminal()
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().unwrap() = next;
    }

    fn fail(&self, reason: FailReason) {
        tracing::warn!(target: "datastream", %reason, "transport failed");
        self.set_state(ConnectionState::Failed(reason));
    }

    /// Moves to Draining unless the instance already failed.
    fn enter_draining(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.is_terminal() {
            *state = ConnectionState::Draining;
        }
    }

    /// Opens the duplex stream.
    ///
    /// Bounded by the connect timeout; a timeout, rejection, or missing
    /// channel moves the instance to `Failed` with the classified reason.
    /// Cancellation moves it to `Draining` instead.
    pub async fn open(&self) -> Result<(), ConnectError> {
        {
            let mut state = self.state.lock().unwrap();
            debug_assert!(
                matches!(*state, ConnectionState::Disconnected),
                "open called on a transport that is not disconnected"
            );
            *state = ConnectionState::Connecting;
        }

        let Some(channel) = self.channel.clone() else {
            let err = ConnectError::ChannelUnavailable;
            self.fail(FailReason::Connect(err.clone()));
            return Err(err);
        };

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ConnectError::Cancelled),
            result = timeout(
                self.config.connect_timeout,
                channel.open(&self.headers, self.config.connect_timeout, &self.cancel),
            ) => match result {
                Ok(inner) => inner,
                Err(_) => Err(ConnectError::DeadlineExceeded),
            },
        };

        match opened {
            Ok((tx_half, rx_half)) => {
                *self.tx.lock().await = Some(tx_half);
                *self.rx.lock().await = Some(rx_half);
                self.set_state(ConnectionState::Streaming);
                tracing::debug!(target: "datastream", "duplex stream established");
                Ok(())
            }
            Err(ConnectError::Cancelled) => {
                self.enter_draining();
                Err(ConnectError::Cancelled)
            }
            Err(err) => {
                self.fail(FailReason::Connect(err.clone()));
                Err(err)
            }
        }
    }

    /// Sends one encoded payload.
    ///
    /// Valid only while Streaming. Cancellation returns
    /// [`StreamError::Cancelled`] promptly and moves the instance to
    /// `Draining`; any other failure is terminal for the instance.
    pub async fn send(&self, item: Req) -> Result<(), StreamError> {
        if !matches!(self.state(), ConnectionState::Streaming) {
            return Err(StreamError::Closed);
        }

        let mut guard = self.tx.lock().await;
        let Some(tx_half) = guard.as_mut() else {
            return Err(StreamError::Closed);
        };

        let result = {
            let send_fut = tx_half.send(item);
            tokio::pin!(send_fut);
            match self.config.send_timeout {
                Some(limit) => tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Err(StreamError::Cancelled),
                    result = timeout(limit, &mut send_fut) => match result {
                        Ok(inner) => inner,
                        Err(_) => Err(StreamError::Timeout),
                    },
                },
                None => tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Err(StreamError::Cancelled),
                    result = &mut send_fut => result,
                },
            }
        };
        drop(guard);

        self.settle_stream_result(result)
    }

    /// Receives the next response, passing it through unclassified.
    ///
    /// `Ok(None)` means the server completed the response stream; the
    /// instance moves to `Draining` and the caller decides whether to
    /// reconnect.
    pub async fn recv(&self) -> Result<Option<Res>, StreamError> {
        if !matches!(
            self.state(),
            ConnectionState::Streaming | ConnectionState::Draining
        ) {
            return Err(StreamError::Closed);
        }

        let mut guard = self.rx.lock().await;
        let Some(rx_half) = guard.as_mut() else {
            return Err(StreamError::Closed);
        };

        let received = {
            let recv_fut = rx_half.recv();
            tokio::pin!(recv_fut);
            match self.config.recv_timeout {
                Some(limit) => tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Some(Err(StreamError::Cancelled)),
                    result = timeout(limit, &mut recv_fut) => match result {
                        Ok(inner) => inner,
                        Err(_) => Some(Err(StreamError::Timeout)),
                    },
                },
                None => tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Some(Err(StreamError::Cancelled)),
                    result = &mut recv_fut => result,
                },
            }
        };
        drop(guard);

        match received {
            Some(Ok(response)) => Ok(Some(response)),
            Some(Err(err)) => self.settle_stream_result(Err(err)).map(|()| None),
            None => {
                tracing::debug!(target: "datastream", "server completed the response stream");
                self.enter_draining();
                Ok(None)
            }
        }
    }

    fn settle_stream_result(&self, result: Result<(), StreamError>) -> Result<(), StreamError> {
        if let Err(err) = &result {
            if err.is_cancellation() {
                self.enter_draining();
            } else {
                self.fail(FailReason::Stream(err.clone()));
            }
        }
        result
    }

    /// Closes the stream.
    ///
    /// In-flight sends get the grace period to complete; past it, both
    /// paths are forced to unwind via the transport-scoped token. A failed
    /// instance stays `Failed`; otherwise the state reaches
    /// `Disconnected`.
    pub async fn close(&self) {
        self.enter_draining();

        let mut tx_guard = match timeout(self.config.grace_period, self.tx.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                // Grace expired: abandon the in-flight send.
                self.cancel.cancel();
                self.tx.lock().await
            }
        };
        if let Some(mut tx_half) = tx_guard.take() {
            tx_half.shutdown().await;
        }
        drop(tx_guard);

        // Wake a blocked receive path before discarding the half.
        self.cancel.cancel();
        self.rx.lock().await.take();

        let mut state = self.state.lock().unwrap();
        if matches!(*state, ConnectionState::Draining) {
            *state = ConnectionState::Disconnected;
        }
    }
}
