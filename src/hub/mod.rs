//! The broadcast hub: connection registry, bounded history, and fan-out.
//!
//! One `ChatHub` instance exists per process. Publish is serialized end to
//! end (stamping, history append, fan-out) under a single lock, so global
//! publish order, history order, and delivery order are all the same for
//! every client.

pub mod history;
pub mod message;
pub mod registry;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::common::time::{Clock, SystemClock};

use history::{HistoryBuffer, REPLAY_LIMIT};
use message::{ChatMessage, InboundPayload};
use registry::{ConnectionHandle, ConnectionId, Registry};

struct HubState {
    registry: Registry,
    history: HistoryBuffer,
}

/// Single-process broadcast hub. Cloneable; all clones share state.
#[derive(Clone)]
pub struct ChatHub {
    state: Arc<Mutex<HubState>>,
    clock: Arc<dyn Clock>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                registry: Registry::new(),
                history: HistoryBuffer::new(),
            })),
            clock,
        }
    }

    /// Register a freshly established connection, then replay up to the last
    /// [`REPLAY_LIMIT`] history entries to it in original publish order.
    ///
    /// A handle that breaks during replay is removed again immediately; a
    /// broken joiner never fails the hub.
    pub async fn on_join(&self, handle: ConnectionHandle) {
        let mut state = self.state.lock().await;
        let id = handle.id();
        state.registry.join(handle.clone());
        tracing::info!("Connection '{}' joined ({} connected)", id, state.registry.len());

        let mut replay_failed = false;
        for message in state.history.recent(REPLAY_LIMIT) {
            if handle.deliver(&message.to_frame()).is_err() {
                replay_failed = true;
                break;
            }
        }
        if replay_failed {
            tracing::warn!("Replay to connection '{}' failed, removing it", id);
            state.registry.leave(id);
        }
    }

    /// Remove a connection from the registry. Safe to call multiple times
    /// for the same connection (read-failure path and disconnect path may
    /// both reach here).
    pub async fn on_leave(&self, id: ConnectionId) {
        let mut state = self.state.lock().await;
        state.registry.leave(id);
        tracing::info!("Connection '{}' left ({} connected)", id, state.registry.len());
    }

    /// Stamp an untrusted payload, record it in history, and fan it out to
    /// every registered connection, including the publisher (the sender
    /// needs the echo to learn its server-assigned id and timestamp).
    ///
    /// Always succeeds once the message is recorded: a recipient whose
    /// delivery fails is pruned, never surfaced to the publisher.
    pub async fn publish(&self, payload: InboundPayload) -> ChatMessage {
        let mut state = self.state.lock().await;

        let message = ChatMessage::stamp(payload, self.clock.as_ref());
        let frame = message.to_frame();
        state.history.append(message.clone());

        let mut dead = Vec::new();
        for handle in state.registry.snapshot() {
            if let Err(e) = handle.deliver(&frame) {
                tracing::warn!("Fan-out delivery failed, pruning: {}", e);
                dead.push(handle.id());
            }
        }
        for id in dead {
            state.registry.leave(id);
        }

        message
    }

    /// Current registry size, for the status surface.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    async fn join_test_client(hub: &ChatHub) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        let id = handle.id();
        hub.on_join(handle).await;
        (id, rx)
    }

    fn payload(json: &str) -> InboundPayload {
        serde_json::from_str(json).unwrap()
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            messages.push(serde_json::from_str(&frame).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn test_publish_delivers_in_order_to_every_client() {
        // given:
        let hub = ChatHub::new();
        let (_a, mut rx_a) = join_test_client(&hub).await;
        let (_b, mut rx_b) = join_test_client(&hub).await;

        // when:
        for i in 0..5 {
            hub.publish(payload(&format!(r#"{{"user":"a","text":"{}"}}"#, i)))
                .await;
        }

        // then: both clients see the same order, no gaps
        let expected = vec!["0", "1", "2", "3", "4"];
        let texts_a: Vec<String> = drain(&mut rx_a).into_iter().map(|m| m.text).collect();
        let texts_b: Vec<String> = drain(&mut rx_b).into_iter().map(|m| m.text).collect();
        assert_eq!(texts_a, expected);
        assert_eq!(texts_b, expected);
    }

    #[tokio::test]
    async fn test_message_is_delivered_exactly_once_while_connected() {
        // given:
        let hub = ChatHub::new();
        let (_a, mut rx_a) = join_test_client(&hub).await;

        // when:
        let published = hub.publish(payload(r#"{"user":"a","text":"hi"}"#)).await;

        // then: exactly one copy
        let received = drain(&mut rx_a);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], published);
    }

    #[tokio::test]
    async fn test_message_published_after_leave_is_not_delivered() {
        // given:
        let hub = ChatHub::new();
        let (id_a, mut rx_a) = join_test_client(&hub).await;
        hub.publish(payload(r#"{"text":"before"}"#)).await;
        hub.on_leave(id_a).await;

        // when:
        hub.publish(payload(r#"{"text":"after"}"#)).await;

        // then: only the message from before the leave arrived
        let texts: Vec<String> = drain(&mut rx_a).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["before"]);
    }

    #[tokio::test]
    async fn test_join_replays_only_the_most_recent_window() {
        // given: more published messages than the replay window
        let hub = ChatHub::new();
        for i in 0..60 {
            hub.publish(payload(&format!(r#"{{"text":"{}"}}"#, i))).await;
        }

        // when:
        let (_id, mut rx) = join_test_client(&hub).await;

        // then: exactly the 50 most recent, in original publish order
        let texts: Vec<String> = drain(&mut rx).into_iter().map(|m| m.text).collect();
        assert_eq!(texts.len(), REPLAY_LIMIT);
        assert_eq!(texts.first().map(String::as_str), Some("10"));
        assert_eq!(texts.last().map(String::as_str), Some("59"));
    }

    #[tokio::test]
    async fn test_join_replays_everything_when_history_is_short() {
        // given:
        let hub = ChatHub::new();
        for i in 0..3 {
            hub.publish(payload(&format!(r#"{{"text":"{}"}}"#, i))).await;
        }

        // when:
        let (_id, mut rx) = join_test_client(&hub).await;

        // then:
        let texts: Vec<String> = drain(&mut rx).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_broken_joiner_is_removed_during_replay() {
        // given: history to replay and a handle whose transport is already gone
        let hub = ChatHub::new();
        hub.publish(payload(r#"{"text":"hi"}"#)).await;

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        // when:
        hub.on_join(ConnectionHandle::new(tx)).await;

        // then:
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_one_failed_recipient_does_not_abort_the_fan_out() {
        // given: three clients, the middle one with a dead transport
        let hub = ChatHub::new();
        let (_a, mut rx_a) = join_test_client(&hub).await;
        let (_b, rx_b) = join_test_client(&hub).await;
        let (_c, mut rx_c) = join_test_client(&hub).await;
        drop(rx_b);

        // when:
        let published = hub.publish(payload(r#"{"user":"a","text":"hi"}"#)).await;

        // then: the other recipients still receive it and the dead one is pruned
        assert_eq!(drain(&mut rx_a), vec![published.clone()]);
        assert_eq!(drain(&mut rx_c), vec![published]);
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_leave_is_tolerated() {
        // given:
        let hub = ChatHub::new();
        let (id, _rx) = join_test_client(&hub).await;

        // when: read-failure path and disconnect path both report the leave
        hub.on_leave(id).await;
        hub.on_leave(id).await;

        // then:
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_three_client_scenario() {
        // given: three clients join in order A, B, C
        let hub = ChatHub::new();
        let (_id_a, mut rx_a) = join_test_client(&hub).await;
        let (id_b, mut rx_b) = join_test_client(&hub).await;
        let (_id_c, mut rx_c) = join_test_client(&hub).await;

        // when: A publishes
        hub.publish(payload(r#"{"user":"a","text":"hi"}"#)).await;

        // then: all of A, B, C receive the stamped message
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let received = drain(rx);
            assert_eq!(received.len(), 1);
            let message = &received[0];
            assert_eq!(message.user, "a");
            assert_eq!(message.text, "hi");
            assert!(!message.id.is_empty());
            assert!(message.timestamp.ends_with('Z'));
        }

        // when: B disconnects and C publishes
        hub.on_leave(id_b).await;
        hub.publish(payload(r#"{"user":"c","text":"bye"}"#)).await;

        // then: only A and C receive it
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_c).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn test_publish_with_no_connections_still_records_history() {
        // given:
        let hub = ChatHub::new();

        // when:
        hub.publish(payload(r#"{"text":"lonely"}"#)).await;
        let (_id, mut rx) = join_test_client(&hub).await;

        // then: the message is replayed to the first joiner
        let texts: Vec<String> = drain(&mut rx).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["lonely"]);
    }
}
