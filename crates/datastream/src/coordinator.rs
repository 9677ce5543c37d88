//! Export coordinator.
//!
//! Feeds encoded batches into the streaming transport, applies exponential
//! backoff with jitter between connection attempts, and reports terminal
//! vs. retryable outcomes to the caller. Every attempt builds a fresh
//! transport instance: a batch is handed to any given instance at most
//! once, and a `Failed` instance is simply dropped.

use crate::channel::{ConnectMetadata, DuplexChannel};
use crate::error::{ConnectError, ExportError, StreamError};
use crate::transport::{StreamingTransport, TransportConfig};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

// =============================================================================
// RESPONSE CLASSIFICATION
// =============================================================================

/// How the caller interprets one collector response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The batch was accepted; the export is done.
    Accepted,
    /// Rejected, but worth retrying on a fresh connection.
    RetryableRejected,
    /// Rejected permanently; automatic retry must stop.
    FatalRejected,
}

/// Classifies collector responses.
///
/// The transport passes responses through untouched; semantics live with
/// the payload kind, so the coordinator takes the classification as a
/// capability.
pub trait ResponseClassifier<Res>: Send + Sync {
    fn classify(&self, response: &Res) -> ResponseOutcome;
}

/// Any matching closure is a classifier.
impl<Res, F> ResponseClassifier<Res> for F
where
    F: Fn(&Res) -> ResponseOutcome + Send + Sync,
{
    fn classify(&self, response: &Res) -> ResponseOutcome {
        self(response)
    }
}

// =============================================================================
// BACKOFF
// =============================================================================

/// Backoff behavior between connection attempts.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the second attempt (the first has none).
    pub initial_delay: Duration,
    /// Cap on the exponential growth, jitter included.
    pub max_delay: Duration,
    /// Growth factor per attempt (e.g. 2.0 doubles the delay).
    pub multiplier: f64,
    /// Fraction of the base delay added as uniform random jitter
    /// (0.2 means up to +20%).
    pub jitter_fraction: f64,
    /// Total attempts before giving up (1 = no retries).
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.2,
            max_attempts: 4,
        }
    }
}

impl BackoffConfig {
    /// Deterministic part of the delay for a 0-indexed attempt.
    fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let millis =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi((attempt - 1) as i32);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }

    /// Base delay plus jitter, capped at `max_delay`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if base.is_zero() || self.jitter_fraction <= 0.0 {
            return base;
        }
        let jitter = base.as_secs_f64() * self.jitter_fraction * rand::random::<f64>();
        (base + Duration::from_secs_f64(jitter)).min(self.max_delay)
    }
}

// =============================================================================
// METRICS
// =============================================================================

/// Thread-safe export counters, shared via `Arc`.
#[derive(Debug, Default)]
pub struct ExportMetrics {
    attempts_made: AtomicU64,
    connections_opened: AtomicU64,
    batches_accepted: AtomicU64,
    batches_rejected: AtomicU64,
}

impl ExportMetrics {
    pub fn attempts_made(&self) -> u64 {
        self.attempts_made.load(Ordering::Relaxed)
    }

    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    pub fn batches_accepted(&self) -> u64 {
        self.batches_accepted.load(Ordering::Relaxed)
    }

    pub fn batches_rejected(&self) -> u64 {
        self.batches_rejected.load(Ordering::Relaxed)
    }

    fn record_attempt(&self) {
        self.attempts_made.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connection(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    fn record_accepted(&self) {
        self.batches_accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Drives batches through fresh transport instances until one is accepted,
/// a fatal condition stops retry, or the attempt budget runs out.
///
/// `export` takes `&mut self`, which serializes attempts per endpoint by
/// ownership: at most one active connection attempt at a time.
pub struct ExportCoordinator<C, Req, Res, K>
where
    C: DuplexChannel<Req, Res>,
    K: ResponseClassifier<Res>,
{
    channel: Option<Arc<C>>,
    headers: ConnectMetadata,
    transport_config: TransportConfig,
    backoff: BackoffConfig,
    classifier: K,
    cancel: CancellationToken,
    metrics: Arc<ExportMetrics>,
    _payload: PhantomData<fn(Req) -> Res>,
}

impl<C, Req, Res, K> ExportCoordinator<C, Req, Res, K>
where
    C: DuplexChannel<Req, Res>,
    K: ResponseClassifier<Res>,
{
    pub fn new(
        channel: Option<Arc<C>>,
        headers: ConnectMetadata,
        transport_config: TransportConfig,
        backoff: BackoffConfig,
        classifier: K,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            channel,
            headers,
            transport_config,
            backoff,
            classifier,
            cancel,
            metrics: Arc::new(ExportMetrics::default()),
            _payload: PhantomData,
        }
    }

    pub fn metrics(&self) -> Arc<ExportMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Exports one batch.
    ///
    /// Resolves to exactly one outcome: the accepted response, a fatal
    /// rejection, cancellation, or exhausted attempts. Mid-stream failures
    /// are always retryable; connect failures are retryable unless the
    /// rejection is permanent.
    pub async fn export(&mut self, batch: Req) -> Result<Res, ExportError>
    where
        Req: Clone,
    {
        let max_attempts = self.backoff.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let delay = self.backoff.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(ExportError::Cancelled),
                    () = sleep(delay) => {}
                }
            }
            self.metrics.record_attempt();

            // A fresh instance per attempt: the batch reaches any given
            // instance at most once.
            let transport = StreamingTransport::new(
                self.channel.clone(),
                self.headers.clone(),
                self.transport_config.clone(),
                &self.cancel,
            );

            match transport.open().await {
                Ok(()) => self.metrics.record_connection(),
                Err(ConnectError::Cancelled) => return Err(ExportError::Cancelled),
                Err(err) if err.is_fatal() => {
                    self.metrics.record_rejected();
                    return Err(ExportError::Fatal {
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        target: "datastream",
                        attempt,
                        error = %err,
                        "connect attempt failed; backing off"
                    );
                    continue;
                }
            }

            if let Err(err) = transport.send(batch.clone()).await {
                if err.is_cancellation() {
                    return Err(ExportError::Cancelled);
                }
                tracing::warn!(target: "datastream", attempt, error = %err, "send failed");
                continue;
            }

            match transport.recv().await {
                Ok(Some(response)) => match self.classifier.classify(&response) {
                    ResponseOutcome::Accepted => {
                        self.metrics.record_accepted();
                        transport.close().await;
                        return Ok(response);
                    }
                    ResponseOutcome::RetryableRejected => {
                        self.metrics.record_rejected();
                        tracing::warn!(target: "datastream", attempt, "batch rejected; will retry");
                        transport.close().await;
                    }
                    ResponseOutcome::FatalRejected => {
                        self.metrics.record_rejected();
                        transport.close().await;
                        return Err(ExportError::Fatal {
                            reason: "collector rejected the batch permanently".to_string(),
                        });
                    }
                },
                Ok(None) => {
                    tracing::warn!(
                        target: "datastream",
                        attempt,
                        "stream ended before a response arrived"
                    );
                    transport.close().await;
                }
                Err(StreamError::Cancelled) => return Err(ExportError::Cancelled),
                Err(err) => {
                    tracing::warn!(target: "datastream", attempt, error = %err, "receive failed");
                }
            }
        }

        Err(ExportError::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}
