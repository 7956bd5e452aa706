//! Ingestion adapters.
//!
//! Historical access goes through [`InboxSource::fetch_range`]; live
//! delivery is a `tokio::sync::mpsc` channel of [`InboundMessage`], fed for
//! example by [`spawn_jsonl_feed`] from a reader thread.

mod jsonl;
mod memory;

use async_trait::async_trait;
pub use jsonl::{FeedThread, JsonlInbox, LineStats, spawn_jsonl_feed};
pub use memory::MemoryInbox;
use sealpost_core::InboundMessage;
use thiserror::Error;

/// Failures reading the device inbox.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The inbox could not be read
    #[error("inbox unavailable: {0}")]
    Unavailable(String),
}

/// Random access to previously received messages.
///
/// # Invariants
///
/// - Results only contain messages with `start <= received_at <= end`
/// - Results are ordered by `received_at` ascending
/// - Calls are restartable: the same window may be fetched again
#[async_trait]
pub trait InboxSource: Send + Sync {
    /// Fetch all messages received within `[start, end]` (inclusive,
    /// milliseconds since epoch).
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Vec<InboundMessage>, IngestError>;
}

/// Keep messages within `[start, end]` and order them by receipt time.
///
/// The sort is stable: messages received in the same millisecond keep the
/// order the inbox returned them in.
pub(crate) fn window_sorted(
    messages: impl IntoIterator<Item = InboundMessage>,
    start: u64,
    end: u64,
) -> Vec<InboundMessage> {
    let mut selected: Vec<_> = messages
        .into_iter()
        .filter(|m| (start..=end).contains(&m.received_at()))
        .collect();
    selected.sort_by_key(InboundMessage::received_at);
    selected
}
