//! Sealpost relay runtime.
//!
//! Wires [`sealpost_core`]'s encryption gate to real I/O: a live message
//! channel, an inbox for historical replay, a key file, an emission port
//! and an audit sink.
//!
//! # Architecture
//!
//! ```text
//!  live feed ──mpsc──┐
//!                    ├──▶ Dispatcher ──▶ task per message ──▶ EmissionPort
//!  HistoricalReplay ─┘        │             │
//!                             │             └──▶ AuditSink (one Outcome each)
//!                             ▼
//!                      EncryptionGate ◀── KeyStore (FileKeyStore)
//! ```
//!
//! # Components
//!
//! - [`Dispatcher`]: Spawns one isolated pipeline per message
//! - [`HistoricalReplay`]: Re-feeds a time window from an [`InboxSource`]
//! - [`Relay`]: Runs the live loop until the feed closes or shutdown
//! - [`FileKeyStore`]: Key store re-read from disk on every check
//! - [`JsonlEmitter`] / [`JsonlInbox`]: JSON lines adapters
//! - [`SystemEnv`]: Production environment (real time)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod dispatcher;
pub mod emitter;
mod error;
pub mod inbox;
mod key_file;
mod replay;
mod system_env;

use std::{future::Future, path::PathBuf, sync::Arc};

pub use audit::{AuditSink, DropReason, MemoryAudit, Outcome, OutcomeRecord, TracingAudit};
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherConfig, StatsSnapshot};
pub use emitter::{ChaoticEmitter, EmissionPort, EmitError, JsonlEmitter, MemoryEmitter};
pub use error::RelayError;
pub use inbox::{FeedThread, InboxSource, IngestError, JsonlInbox, MemoryInbox, spawn_jsonl_feed};
pub use key_file::FileKeyStore;
pub use replay::{HistoricalReplay, ReplayError, ReplaySummary, ReplayWindow};
use sealpost_core::{EncryptionGate, InboundMessage, env::Environment};
pub use system_env::SystemEnv;
use tokio::sync::mpsc;

/// Configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct RelayRuntimeConfig {
    /// Path of the PEM public key file
    pub key_path: PathBuf,
    /// Path of the JSON lines output file (appended to)
    pub out_path: PathBuf,
    /// Dispatcher configuration (concurrency limit)
    pub dispatcher: DispatcherConfig,
}

impl Default for RelayRuntimeConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("public_key.pem"),
            out_path: PathBuf::from("events.jsonl"),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

/// Why [`Relay::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The live feed closed; every accepted message reached an outcome
    FeedClosed,
    /// Shutdown was requested; in-flight messages were aborted
    Shutdown {
        /// Messages aborted without an outcome
        cancelled: usize,
        /// Messages still buffered in the live channel, discarded unsubmitted
        unsubmitted: usize,
    },
}

/// Relay runtime.
pub struct Relay<E: Environment> {
    dispatcher: Arc<Dispatcher<E>>,
}

impl Relay<SystemEnv> {
    /// Build a production relay: file key store, JSON lines output,
    /// `tracing` audit log, system clock.
    pub async fn open(config: &RelayRuntimeConfig) -> Result<Self, RelayError> {
        if config.dispatcher.max_in_flight == 0 {
            return Err(RelayError::Config("max_in_flight must be at least 1".into()));
        }

        let store = Arc::new(FileKeyStore::new(&config.key_path));
        let port = JsonlEmitter::open(&config.out_path).await.map_err(|e| {
            RelayError::Io(format!("cannot open {}: {e}", config.out_path.display()))
        })?;

        let gate = EncryptionGate::new(store);
        if !gate.is_configured() {
            tracing::warn!(
                key = %config.key_path.display(),
                "no encryption key configured; messages will be dropped until one is set"
            );
        }

        let dispatcher = Dispatcher::new(
            gate,
            Arc::new(port),
            Arc::new(TracingAudit),
            SystemEnv,
            config.dispatcher.clone(),
        );

        Ok(Self::from_dispatcher(dispatcher))
    }
}

impl<E: Environment> Relay<E> {
    /// Wrap an already assembled dispatcher.
    pub fn from_dispatcher(dispatcher: Dispatcher<E>) -> Self {
        Self { dispatcher: Arc::new(dispatcher) }
    }

    /// The dispatcher live and replayed messages go through.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<E>> {
        &self.dispatcher
    }

    /// Submit everything within `window` from `source`.
    pub async fn replay<S: InboxSource>(
        &self,
        source: S,
        window: ReplayWindow,
    ) -> Result<ReplaySummary, RelayError> {
        let summary = HistoricalReplay::new(source).replay(window, &self.dispatcher).await?;
        Ok(summary)
    }

    /// Submit live messages until the feed closes or `shutdown` resolves.
    ///
    /// On feed close the relay waits for every accepted message to reach
    /// its outcome. On shutdown it aborts whatever is still in flight, closes
    /// the channel and discards what the feed had buffered. Neither group
    /// gets an outcome; both are counted in the returned [`RunExit`].
    pub async fn run(
        &self,
        mut live: mpsc::Receiver<InboundMessage>,
        shutdown: impl Future<Output = ()>,
    ) -> RunExit {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    let unsubmitted = discard_buffered(&mut live);
                    let cancelled = self.dispatcher.shutdown().await;
                    return RunExit::Shutdown { cancelled, unsubmitted };
                },
                message = live.recv() => match message {
                    Some(message) => self.dispatcher.submit(message),
                    None => {
                        tracing::info!("live feed closed, draining");
                        self.dispatcher.drain().await;
                        return RunExit::FeedClosed;
                    },
                },
            }
        }
    }
}

/// Close the live channel and discard whatever it still holds.
fn discard_buffered(live: &mut mpsc::Receiver<InboundMessage>) -> usize {
    live.close();

    let mut discarded = 0;
    while let Ok(message) = live.try_recv() {
        message.discard();
        discarded += 1;
    }
    discarded
}
