//! In-memory inbox for tests and simulation.

use async_trait::async_trait;
use sealpost_core::InboundMessage;

use super::{InboxSource, IngestError, window_sorted};

/// Inbox backed by a vector, in any order.
#[derive(Debug, Clone, Default)]
pub struct MemoryInbox {
    messages: Vec<InboundMessage>,
}

impl MemoryInbox {
    /// Create an inbox holding `messages`.
    pub fn new(messages: Vec<InboundMessage>) -> Self {
        Self { messages }
    }

    /// Add a message.
    pub fn push(&mut self, message: InboundMessage) {
        self.messages.push(message);
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if the inbox is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl InboxSource for MemoryInbox {
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Vec<InboundMessage>, IngestError> {
        Ok(window_sorted(self.messages.iter().cloned(), start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(received_at: u64) -> InboundMessage {
        InboundMessage::Text {
            sender: "+1".to_string(),
            received_at,
            body: format!("m{received_at}"),
            sim_slot: None,
        }
    }

    #[tokio::test]
    async fn window_is_inclusive_and_sorted() {
        let inbox = MemoryInbox::new(vec![text(30), text(5), text(10), text(20), text(31)]);

        let fetched = inbox.fetch_range(10, 30).await.unwrap();
        let times: Vec<u64> = fetched.iter().map(InboundMessage::received_at).collect();

        assert_eq!(times, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn empty_window_is_not_an_error() {
        let inbox = MemoryInbox::new(vec![text(1)]);
        assert!(inbox.fetch_range(100, 200).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn equal_timestamps_keep_inbox_order() {
        let first = InboundMessage::Text {
            sender: "+1".to_string(),
            received_at: 7,
            body: "first".to_string(),
            sim_slot: None,
        };
        let second = InboundMessage::Text {
            sender: "+2".to_string(),
            received_at: 7,
            body: "second".to_string(),
            sim_slot: None,
        };
        let inbox = MemoryInbox::new(vec![first.clone(), second.clone()]);

        assert_eq!(inbox.fetch_range(0, 10).await.unwrap(), vec![first, second]);
    }
}
