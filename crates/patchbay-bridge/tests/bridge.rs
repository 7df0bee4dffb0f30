use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use patchbay_bridge::{BridgeAdapter, BridgeConfig, BridgeDriver};
use patchbay_core::{ContactChange, ContactId, GroupId, Value};
use patchbay_driver::{Driver, DriverError};
use patchbay_events::KernelEvent;
use tokio::sync::Mutex;

struct RecordingAdapter {
    batches: Mutex<Vec<usize>>,
    fail_first_n: AtomicU32,
    calls: AtomicUsize,
}

impl RecordingAdapter {
    fn new(fail_first_n: u32) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_first_n: AtomicU32::new(fail_first_n),
            calls: AtomicUsize::new(0),
        }
    }

    /// An adapter that never succeeds, for exercising the queue-when-down
    /// and circuit-open paths without ever getting a batch through.
    fn always_failing() -> Self {
        Self::new(u32::MAX)
    }
}

#[async_trait]
impl BridgeAdapter for RecordingAdapter {
    async fn send_batch(&self, changes: &[ContactChange]) -> Result<(), DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first_n.load(Ordering::SeqCst) > 0 {
            self.fail_first_n.fetch_sub(1, Ordering::SeqCst);
            return Err(DriverError::transient("simulated transport failure"));
        }
        self.batches.lock().await.push(changes.len());
        Ok(())
    }
}

fn sample_change() -> ContactChange {
    numbered_change(1.0)
}

fn numbered_change(n: f64) -> ContactChange {
    ContactChange::new(ContactId::new(), GroupId::new(), None, Value::Number(n), Utc::now())
}

struct Forwarding(Arc<RecordingAdapter>);

#[async_trait]
impl BridgeAdapter for Forwarding {
    async fn send_batch(&self, changes: &[ContactChange]) -> Result<(), DriverError> {
        self.0.send_batch(changes).await
    }
}

#[tokio::test(start_paused = true)]
async fn batch_flushes_after_debounce_delay() {
    let adapter = Arc::new(RecordingAdapter::new(0));
    let config = BridgeConfig {
        batch_size: 100,
        batch_delay: Duration::from_millis(50),
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "test-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );

    driver.initialize().await.unwrap();
    driver.start_listening().await.unwrap();
    driver.handle_change(sample_change()).await.unwrap();
    driver.handle_change(sample_change()).await.unwrap();

    assert!(adapter.batches.lock().await.is_empty());

    tokio::time::advance(Duration::from_millis(60)).await;
    tokio::task::yield_now().await;

    assert_eq!(*adapter.batches.lock().await, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn batch_flushes_immediately_once_size_threshold_hit() {
    let adapter = Arc::new(RecordingAdapter::new(0));
    let config = BridgeConfig {
        batch_size: 2,
        batch_delay: Duration::from_secs(60),
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "test-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );

    driver.start_listening().await.unwrap();
    driver.handle_change(sample_change()).await.unwrap();
    driver.handle_change(sample_change()).await.unwrap();

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(*adapter.batches.lock().await, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_with_backoff() {
    let adapter = Arc::new(RecordingAdapter::new(2));

    let config = BridgeConfig {
        batch_size: 1,
        batch_delay: Duration::from_millis(10),
        retry_attempts: 5,
        retry_delay: Duration::from_millis(100),
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "retrying-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );

    driver.start_listening().await.unwrap();
    driver.handle_change(sample_change()).await.unwrap();

    for _ in 0..10 {
        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
    }

    assert_eq!(*adapter.batches.lock().await, vec![1]);
    let stats = driver.bridge_stats().await;
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.batches_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn s4_circuit_breaker_opens_then_recovers_through_half_open() {
    use patchbay_driver::BridgeCapability;

    // Three calls fail, then the adapter starts succeeding; one attempt per
    // dispatch, so the breaker sees exactly those three failures.
    let adapter = Arc::new(RecordingAdapter::new(3));
    let config = BridgeConfig {
        retry_attempts: 1,
        retry_delay: Duration::ZERO,
        circuit_failure_threshold: 3,
        circuit_reset_timeout: Duration::from_millis(100),
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "circuit-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );

    for _ in 0..3 {
        assert!(driver.dispatch_batch(vec![sample_change()]).await.is_err());
    }
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);

    // Breaker is open: the 4th attempt fails fast without reaching the adapter.
    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_err());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);

    tokio::time::advance(Duration::from_millis(150)).await;

    // Half-open probe succeeds and closes the breaker.
    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_ok());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 4);

    // Closed again: dispatch runs normally, no fast-fail.
    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_ok());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn s4_half_open_failure_reopens_with_a_fresh_timer() {
    use patchbay_driver::BridgeCapability;

    let adapter = Arc::new(RecordingAdapter::always_failing());
    let config = BridgeConfig {
        retry_attempts: 1,
        retry_delay: Duration::ZERO,
        circuit_failure_threshold: 1,
        circuit_reset_timeout: Duration::from_millis(100),
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "circuit-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );

    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_err());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(150)).await;

    // Half-open probe fails, so the breaker reopens.
    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_err());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);

    // Still within the fresh reset window: fails fast again, no adapter call.
    tokio::time::advance(Duration::from_millis(50)).await;
    assert!(driver.dispatch_batch(vec![sample_change()]).await.is_err());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn s5_queue_overflow_drops_oldest_and_emits_an_event() {
    let adapter = Arc::new(RecordingAdapter::always_failing());
    let config = BridgeConfig {
        batch_size: 1,
        batch_delay: Duration::from_secs(3600),
        retry_attempts: 1,
        retry_delay: Duration::ZERO,
        circuit_failure_threshold: 10,
        queue_capacity: 3,
        ..BridgeConfig::default()
    };

    let driver = BridgeDriver::new(
        "overflowing-bridge",
        Box::new(Forwarding(Arc::clone(&adapter))),
        config,
        None,
    );
    let mut events = driver.subscribe_events();

    driver.start_listening().await.unwrap();
    for n in 1..=5 {
        driver.handle_change(numbered_change(n as f64)).await.unwrap();
        // Let the spawned flush run and fail, returning the batch to the queue
        // before the next push, so the queue actually accumulates v1..v5.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    let stats = driver.bridge_stats().await;
    assert_eq!(stats.changes_dropped, 2);

    let remaining = driver.queued_changes().await;
    let values: Vec<f64> = remaining
        .iter()
        .map(|c| match c.current {
            Value::Number(n) => n,
            _ => panic!("expected a numeric change"),
        })
        .collect();
    assert_eq!(values, vec![3.0, 4.0, 5.0]);

    for _ in 0..2 {
        let event = events.recv().await.unwrap();
        assert!(matches!(&*event, KernelEvent::QueueOverflow { .. }));
    }
}
