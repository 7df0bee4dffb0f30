//! A [`BridgeAdapter`] double for exercising batching, retry, the circuit
//! breaker, and long-polling without a real external peer (spec §8
//! scenarios S4–S6).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use patchbay_bridge::{BridgeAdapter, PollResult};
use patchbay_core::ContactChange;
use patchbay_driver::DriverError;

/// Records every batch handed to [`BridgeAdapter::send_batch`] and can be
/// configured to fail a fixed number of sends before succeeding, or to
/// serve canned [`PollResult`]s.
#[derive(Clone, Default)]
pub struct MockBridgeAdapter {
    sent_batches: Arc<Mutex<Vec<Vec<ContactChange>>>>,
    fail_next_sends: Arc<Mutex<u32>>,
    poll_responses: Arc<Mutex<VecDeque<PollResult>>>,
}

impl MockBridgeAdapter {
    /// A mock that accepts every send and has nothing to poll.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next `count` calls to [`BridgeAdapter::send_batch`] to fail
    /// with a transient error.
    pub fn fail_next_sends(&self, count: u32) {
        *self.fail_next_sends.lock().unwrap_or_else(|e| e.into_inner()) = count;
    }

    /// Queue a [`PollResult`] to return from the next call to
    /// [`BridgeAdapter::poll`]; once the queue is empty, `poll` returns an
    /// empty result.
    pub fn queue_poll_result(&self, result: PollResult) {
        self.poll_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
    }

    /// Every batch accepted so far, in send order.
    #[must_use]
    pub fn sent_batches(&self) -> Vec<Vec<ContactChange>> {
        self.sent_batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every change accepted so far, flattened across batches, in order.
    #[must_use]
    pub fn sent_changes(&self) -> Vec<ContactChange> {
        self.sent_batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl BridgeAdapter for MockBridgeAdapter {
    async fn send_batch(&self, changes: &[ContactChange]) -> Result<(), DriverError> {
        let mut remaining = self.fail_next_sends.lock().unwrap_or_else(|e| e.into_inner());
        if *remaining > 0 {
            *remaining -= 1;
            return Err(DriverError::transient("mock adapter: simulated failure"));
        }
        drop(remaining);

        self.sent_batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(changes.to_vec());
        Ok(())
    }

    async fn poll(&self, _last_sequence_id: Option<&str>) -> Result<PollResult, DriverError> {
        Ok(self
            .poll_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use patchbay_core::{ContactId, ExternalInput, GroupId, Value};

    use super::*;

    fn change() -> ContactChange {
        ContactChange::new(ContactId::new(), GroupId::new(), None, Value::Bool(true), Utc::now())
    }

    #[tokio::test]
    async fn records_accepted_batches() {
        let adapter = MockBridgeAdapter::new();
        adapter.send_batch(&[change()]).await.unwrap();
        adapter.send_batch(&[change(), change()]).await.unwrap();

        assert_eq!(adapter.sent_batches().len(), 2);
        assert_eq!(adapter.sent_changes().len(), 3);
    }

    #[tokio::test]
    async fn fails_the_configured_number_of_sends() {
        let adapter = MockBridgeAdapter::new();
        adapter.fail_next_sends(2);

        assert!(adapter.send_batch(&[change()]).await.is_err());
        assert!(adapter.send_batch(&[change()]).await.is_err());
        assert!(adapter.send_batch(&[change()]).await.is_ok());
        assert_eq!(adapter.sent_batches().len(), 1);
    }

    #[tokio::test]
    async fn serves_queued_poll_results_in_order() {
        let adapter = MockBridgeAdapter::new();
        adapter.queue_poll_result(PollResult {
            inputs: vec![ExternalInput::Subscribe {
                contact_id: ContactId::new(),
            }],
            next_sequence_id: Some("1".into()),
        });

        let first = adapter.poll(None).await.unwrap();
        assert_eq!(first.inputs.len(), 1);

        let second = adapter.poll(Some("1")).await.unwrap();
        assert!(second.inputs.is_empty());
    }
}
