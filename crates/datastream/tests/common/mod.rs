//! In-memory fake collector used by the transport and coordinator tests.
//!
//! Implements the duplex channel traits over tokio mpsc pairs, with
//! scripted connect behavior and scripted per-record acks.

// Not every test binary uses every scripting knob.
#![allow(dead_code)]

use datastream::{
    ConnectError, ConnectMetadata, DuplexChannel, DuplexRecv, DuplexSend, RejectReason, StreamError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Ack status the fake collector returns for each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    Retry,
    Unauthorized,
}

/// Response payload flowing back from the fake collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordAck {
    pub status: AckStatus,
}

/// How the next `open` call behaves.
#[derive(Debug, Clone, Copy)]
pub enum ConnectBehavior {
    Accept,
    Hang,
    RejectThrottled,
    RejectUnauthenticated,
}

/// Scriptable fake collector endpoint.
#[derive(Default)]
pub struct FakeCollector {
    connect_script: Mutex<VecDeque<ConnectBehavior>>,
    acks: Arc<Mutex<VecDeque<AckStatus>>>,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    opened: AtomicU64,
    send_delay: Option<Duration>,
    failing_sends: bool,
    close_after_acks: Option<usize>,
}

impl FakeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behavior of successive `open` calls; once the script
    /// runs out, connections are accepted.
    pub fn with_connect_script(self, script: Vec<ConnectBehavior>) -> Self {
        *self.connect_script.lock().unwrap() = script.into();
        self
    }

    /// Scripts the ack returned for each record; defaults to `Ok`.
    pub fn with_acks(self, acks: Vec<AckStatus>) -> Self {
        *self.acks.lock().unwrap() = acks.into();
        self
    }

    /// Adds artificial latency inside every send.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Makes every send fail with a connection reset.
    pub fn with_failing_sends(mut self) -> Self {
        self.failing_sends = true;
        self
    }

    /// Server completes its response stream after this many acks.
    pub fn with_close_after_acks(mut self, count: usize) -> Self {
        self.close_after_acks = Some(count);
        self
    }

    /// Number of successfully established connections.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Payloads the server side has seen, across all connections.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }
}

pub struct FakeTx {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    delay: Option<Duration>,
    failing: bool,
}

impl DuplexSend<Vec<u8>> for FakeTx {
    async fn send(&mut self, item: Vec<u8>) -> Result<(), StreamError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(StreamError::ConnectionLost("connection reset".into()));
        }
        match &self.tx {
            Some(tx) => tx
                .send(item)
                .await
                .map_err(|_| StreamError::ConnectionLost("peer closed".into())),
            None => Err(StreamError::Closed),
        }
    }

    async fn shutdown(&mut self) {
        // Dropping the sender ends the server's request loop.
        self.tx.take();
    }
}

pub struct FakeRx {
    rx: mpsc::Receiver<RecordAck>,
}

impl DuplexRecv<RecordAck> for FakeRx {
    async fn recv(&mut self) -> Option<Result<RecordAck, StreamError>> {
        self.rx.recv().await.map(Ok)
    }
}

impl DuplexChannel<Vec<u8>, RecordAck> for FakeCollector {
    type Tx = FakeTx;
    type Rx = FakeRx;

    async fn open(
        &self,
        _headers: &ConnectMetadata,
        _connect_timeout: Duration,
        _cancel: &CancellationToken,
    ) -> Result<(FakeTx, FakeRx), ConnectError> {
        let behavior = self
            .connect_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectBehavior::Accept);

        match behavior {
            ConnectBehavior::Accept => {
                self.opened.fetch_add(1, Ordering::Relaxed);

                let (req_tx, mut req_rx) = mpsc::channel::<Vec<u8>>(16);
                let (ack_tx, ack_rx) = mpsc::channel::<RecordAck>(16);

                let acks = Arc::clone(&self.acks);
                let received = Arc::clone(&self.received);
                let close_after = self.close_after_acks;
                tokio::spawn(async move {
                    let mut sent = 0usize;
                    while let Some(payload) = req_rx.recv().await {
                        received.lock().unwrap().push(payload);
                        let status = acks.lock().unwrap().pop_front().unwrap_or(AckStatus::Ok);
                        if ack_tx.send(RecordAck { status }).await.is_err() {
                            break;
                        }
                        sent += 1;
                        if close_after.is_some_and(|limit| sent >= limit) {
                            break;
                        }
                    }
                    // ack_tx drops here, completing the response stream.
                });

                Ok((
                    FakeTx {
                        tx: Some(req_tx),
                        delay: self.send_delay,
                        failing: self.failing_sends,
                    },
                    FakeRx { rx: ack_rx },
                ))
            }
            ConnectBehavior::Hang => {
                std::future::pending::<Result<(FakeTx, FakeRx), ConnectError>>().await
            }
            ConnectBehavior::RejectThrottled => {
                Err(ConnectError::Rejected(RejectReason::Throttled))
            }
            ConnectBehavior::RejectUnauthenticated => {
                Err(ConnectError::Rejected(RejectReason::Unauthenticated))
            }
        }
    }
}
