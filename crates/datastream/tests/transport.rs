//! Integration tests for the streaming transport state machine.

mod common;

use common::{AckStatus, ConnectBehavior, FakeCollector, RecordAck};
use datastream::{
    ConnectError, ConnectMetadata, ConnectionState, FailReason, RejectReason, StreamError,
    StreamingTransport, TransportConfig,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

type Transport = StreamingTransport<FakeCollector, Vec<u8>, RecordAck>;

fn transport(collector: Option<Arc<FakeCollector>>, config: TransportConfig) -> Transport {
    StreamingTransport::new(
        collector,
        ConnectMetadata::new().with("license_key", "secret"),
        config,
        &CancellationToken::new(),
    )
}

#[tokio::test]
async fn open_without_channel_fails_immediately() {
    let config = TransportConfig::default().with_connect_timeout(Duration::from_secs(5));
    let transport = transport(None, config);

    let start = Instant::now();
    let result = transport.open().await;

    assert_eq!(result, Err(ConnectError::ChannelUnavailable));
    assert!(start.elapsed() < Duration::from_secs(1), "must not wait for the timeout");
    assert_eq!(
        transport.state(),
        ConnectionState::Failed(FailReason::Connect(ConnectError::ChannelUnavailable))
    );
}

#[tokio::test]
async fn connect_timeout_bounds_a_hanging_channel() {
    let collector = Arc::new(FakeCollector::new().with_connect_script(vec![ConnectBehavior::Hang]));
    let config = TransportConfig::default().with_connect_timeout(Duration::from_millis(100));
    let transport = transport(Some(collector), config);

    let start = Instant::now();
    let result = transport.open().await;
    let elapsed = start.elapsed();

    assert_eq!(result, Err(ConnectError::DeadlineExceeded));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2), "never blocks past the timeout");
    assert!(transport.is_failed());
}

#[tokio::test]
async fn throttled_rejection_is_classified_and_retryable() {
    let collector = Arc::new(
        FakeCollector::new().with_connect_script(vec![ConnectBehavior::RejectThrottled]),
    );
    let transport = transport(Some(collector), TransportConfig::default());

    let result = transport.open().await;
    let err = result.unwrap_err();
    assert!(err.is_throttled());
    assert!(!err.is_fatal());
    assert_eq!(
        transport.state(),
        ConnectionState::Failed(FailReason::Connect(ConnectError::Rejected(
            RejectReason::Throttled
        )))
    );
}

#[tokio::test]
async fn unauthenticated_rejection_is_fatal() {
    let collector = Arc::new(
        FakeCollector::new().with_connect_script(vec![ConnectBehavior::RejectUnauthenticated]),
    );
    let transport = transport(Some(collector), TransportConfig::default());

    let err = transport.open().await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn send_and_receive_round_trip() {
    let collector = Arc::new(FakeCollector::new());
    let transport = transport(Some(Arc::clone(&collector)), TransportConfig::default());

    transport.open().await.unwrap();
    assert!(transport.is_streaming());

    transport.send(b"span batch 1".to_vec()).await.unwrap();
    let ack = transport.recv().await.unwrap();
    assert_eq!(ack, Some(RecordAck { status: AckStatus::Ok }));

    assert_eq!(collector.received(), vec![b"span batch 1".to_vec()]);

    transport.close().await;
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn send_never_blocks_on_receive() {
    let collector = Arc::new(FakeCollector::new());
    let transport = Arc::new(transport(Some(collector), TransportConfig::default()));
    transport.open().await.unwrap();

    // Park a receive with nothing to read, then send while it is blocked.
    let receiver = Arc::clone(&transport);
    let recv_task = tokio::spawn(async move { receiver.recv().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    transport.send(b"payload".to_vec()).await.unwrap();

    // The parked receive resolves with the ack for that send.
    let ack = recv_task.await.unwrap().unwrap();
    assert_eq!(ack, Some(RecordAck { status: AckStatus::Ok }));
}

#[tokio::test]
async fn cancellation_during_inflight_send_drains_within_grace() {
    let collector = Arc::new(FakeCollector::new().with_send_delay(Duration::from_secs(30)));
    let cancel = CancellationToken::new();
    let transport = Arc::new(StreamingTransport::new(
        Some(collector),
        ConnectMetadata::new(),
        TransportConfig::default().with_grace_period(Duration::from_millis(500)),
        &cancel,
    ));
    transport.open().await.unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let result = transport.send(b"slow payload".to_vec()).await;

    assert_eq!(result, Err(StreamError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(1), "cancellation must be prompt");
    assert_eq!(transport.state(), ConnectionState::Draining);

    transport.close().await;
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn mid_stream_failure_is_terminal_for_the_instance() {
    let collector = Arc::new(FakeCollector::new().with_failing_sends());
    let transport = transport(Some(collector), TransportConfig::default());
    transport.open().await.unwrap();

    let err = transport.send(b"doomed".to_vec()).await.unwrap_err();
    assert!(matches!(err, StreamError::ConnectionLost(_)));
    assert!(transport.is_failed());

    // Failed is terminal: further operations refuse, close does not revive.
    assert_eq!(transport.send(b"more".to_vec()).await, Err(StreamError::Closed));
    transport.close().await;
    assert!(transport.is_failed());
}

#[tokio::test]
async fn server_completing_response_stream_moves_to_draining() {
    let collector = Arc::new(FakeCollector::new().with_close_after_acks(1));
    let transport = transport(Some(collector), TransportConfig::default());
    transport.open().await.unwrap();

    transport.send(b"only batch".to_vec()).await.unwrap();
    let first = transport.recv().await.unwrap();
    assert!(first.is_some());

    let end = transport.recv().await.unwrap();
    assert_eq!(end, None);
    assert_eq!(transport.state(), ConnectionState::Draining);
}

#[tokio::test]
async fn recv_timeout_is_classified() {
    let collector = Arc::new(FakeCollector::new());
    let config = TransportConfig::default().with_recv_timeout(Duration::from_millis(50));
    let transport = transport(Some(collector), config);
    transport.open().await.unwrap();

    // Nothing was sent, so nothing will be acked.
    let err = transport.recv().await.unwrap_err();
    assert_eq!(err, StreamError::Timeout);
    assert!(transport.is_failed());
}
