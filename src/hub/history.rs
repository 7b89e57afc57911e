//! Bounded, ordered history of published messages.

use std::collections::VecDeque;

use super::message::ChatMessage;

/// Number of recent messages replayed to a newly joined connection.
pub const REPLAY_LIMIT: usize = 50;

/// Total number of messages retained in memory. Older messages are evicted
/// in publish order once the buffer is full.
pub const HISTORY_CAPACITY: usize = 1000;

/// Append-only log of published messages, insertion order == publish order.
#[derive(Debug)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Append one message, evicting the oldest when the buffer is full.
    /// Messages are never reordered or mutated after insertion.
    pub fn append(&mut self, message: ChatMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// The last `limit` messages in original publish order; all of them when
    /// fewer than `limit` have been published.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ChatMessage> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_message(text: &str) -> ChatMessage {
        ChatMessage {
            id: format!("id-{}", text),
            user: "alice".to_string(),
            text: text.to_string(),
            timestamp: "2023-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn texts<'a>(messages: impl Iterator<Item = &'a ChatMessage>) -> Vec<&'a str> {
        messages.map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_recent_with_fewer_messages_than_limit_returns_all() {
        // given:
        let mut history = HistoryBuffer::new();
        for i in 0..3 {
            history.append(create_test_message(&i.to_string()));
        }

        // when:
        let replayed = texts(history.recent(REPLAY_LIMIT));

        // then:
        assert_eq!(replayed, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_recent_returns_exactly_the_last_limit_in_order() {
        // given: more messages than the replay window
        let mut history = HistoryBuffer::new();
        for i in 0..60 {
            history.append(create_test_message(&i.to_string()));
        }

        // when:
        let replayed = texts(history.recent(REPLAY_LIMIT));

        // then: exactly the 50 most recent, in original publish order
        assert_eq!(replayed.len(), 50);
        assert_eq!(replayed.first(), Some(&"10"));
        assert_eq!(replayed.last(), Some(&"59"));
    }

    #[test]
    fn test_recent_on_empty_history_is_empty() {
        // given:
        let history = HistoryBuffer::new();

        // when / then:
        assert_eq!(history.recent(REPLAY_LIMIT).count(), 0);
    }

    #[test]
    fn test_append_evicts_oldest_at_capacity() {
        // given:
        let mut history = HistoryBuffer::with_capacity(3);
        for i in 0..5 {
            history.append(create_test_message(&i.to_string()));
        }

        // when:
        let retained = texts(history.recent(usize::MAX));

        // then: the oldest messages were evicted, order preserved
        assert_eq!(retained, vec!["2", "3", "4"]);
        assert_eq!(history.len(), 3);
    }
}
