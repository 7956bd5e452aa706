//! JSON lines inbox adapters.
//!
//! Each line is one [`InboundMessage`] in its JSON form. Malformed lines are
//! skipped and logged by line number and error category only: parser
//! messages can quote input, and input is plaintext.

use std::{
    io::BufRead,
    path::{Path, PathBuf},
    thread,
};

use async_trait::async_trait;
use sealpost_core::InboundMessage;
use tokio::sync::mpsc;

use super::{InboxSource, IngestError, window_sorted};
use crate::error::RelayError;

/// Line counts from a parsed JSON lines input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineStats {
    /// Lines parsed into messages
    pub accepted: usize,
    /// Non-blank lines that failed to parse
    pub skipped: usize,
}

/// Parse one line, logging (without content) when it is malformed.
fn parse_line(line_no: usize, line: &str, stats: &mut LineStats) -> Option<InboundMessage> {
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(message) => {
            stats.accepted += 1;
            Some(message)
        },
        Err(e) => {
            stats.skipped += 1;
            tracing::warn!(line = line_no, category = ?e.classify(), "skipping malformed inbox line");
            None
        },
    }
}

/// Inbox export file: one message per line, any order.
///
/// The file is re-read on every fetch, so an export that grows between
/// replays is picked up.
#[derive(Debug, Clone)]
pub struct JsonlInbox {
    path: PathBuf,
}

impl JsonlInbox {
    /// Use the export at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Export file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InboxSource for JsonlInbox {
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Vec<InboundMessage>, IngestError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            IngestError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;

        let mut stats = LineStats::default();
        let messages: Vec<_> = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| parse_line(idx + 1, line, &mut stats))
            .collect();

        tracing::debug!(
            path = %self.path.display(),
            accepted = stats.accepted,
            skipped = stats.skipped,
            "inbox export read"
        );

        Ok(window_sorted(messages, start, end))
    }
}

/// Reader thread behind a live feed.
///
/// Blocking reads (stdin in particular) cannot be cancelled, so the reader
/// runs on its own OS thread rather than the runtime's blocking pool. Runtime
/// shutdown never waits for it; dropping this handle detaches the thread.
#[derive(Debug)]
pub struct FeedThread {
    handle: thread::JoinHandle<LineStats>,
}

impl FeedThread {
    /// Whether the reader has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the reader to stop and return its line counts.
    ///
    /// Only call this once the channel has closed; a reader blocked on input
    /// would otherwise hold the wait open.
    pub async fn join(self) -> Result<LineStats, RelayError> {
        let handle = self.handle;
        tokio::task::spawn_blocking(move || handle.join())
            .await
            .map_err(|e| RelayError::Internal(format!("live feed join failed: {e}")))?
            .map_err(|_| RelayError::Internal("live feed reader panicked".to_string()))
    }
}

/// Start a thread turning a JSON lines reader into a live message channel.
///
/// The channel closes when the reader hits EOF or a read error. The reader
/// stops at its next line once the receiver is closed or dropped.
pub fn spawn_jsonl_feed<R>(
    reader: R,
    capacity: usize,
) -> Result<(mpsc::Receiver<InboundMessage>, FeedThread), RelayError>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let handle = thread::Builder::new().name("sealpost-feed".to_string()).spawn(move || {
        let mut stats = LineStats::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "live feed read failed");
                    break;
                },
            };

            if let Some(message) = parse_line(idx + 1, &line, &mut stats)
                && tx.blocking_send(message).is_err()
            {
                tracing::debug!("live feed receiver closed");
                break;
            }
        }

        stats
    })?;

    Ok((rx, FeedThread { handle }))
}
