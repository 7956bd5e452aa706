//! Per-message dispatch.
//!
//! Each submitted message runs its own pipeline as an independent Tokio
//! task:
//!
//! ```text
//! Received
//!    │
//!    ▼  (blocking pool)
//! Gate check ──closed─────────────────────────────▶ Dropped(NotConfigured)
//!    │
//!    ▼
//! Encrypting ──error──────────────────────────────▶ Dropped(KeyParse | EncryptionFailed)
//!    │
//!    ▼
//! Encrypted ──emit──▶ Emitted
//!                └──error / panic──▶ Dropped(EmissionFailed)
//! ```
//!
//! The gate check and sealing both read the key store, which may touch the
//! filesystem, so they run together on the blocking pool. Steps within one
//! message are strictly sequential. Across messages there is no ordering:
//! pipelines overlap and finish in any order. No state is persisted and
//! nothing is retried.

use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::FutureExt;
use sealpost_core::{EncryptionGate, GateError, InboundMessage, OutboundEvent, env::Environment};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    audit::{AuditSink, DropReason, Outcome, OutcomeRecord},
    emitter::EmissionPort,
};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum pipelines running at once. Further submissions are accepted
    /// immediately and wait inside their task for a slot.
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

/// Running totals across all messages.
#[derive(Debug, Default)]
pub struct DispatchStats {
    submitted: AtomicU64,
    emitted: AtomicU64,
    not_configured: AtomicU64,
    key_parse: AtomicU64,
    encryption_failed: AtomicU64,
    emission_failed: AtomicU64,
    cancelled: AtomicU64,
}

impl DispatchStats {
    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Emitted => &self.emitted,
            Outcome::Dropped(DropReason::NotConfigured) => &self.not_configured,
            Outcome::Dropped(DropReason::KeyParse) => &self.key_parse,
            Outcome::Dropped(DropReason::EncryptionFailed) => &self.encryption_failed,
            Outcome::Dropped(DropReason::EmissionFailed) => &self.emission_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            not_configured: self.not_configured.load(Ordering::Relaxed),
            key_parse: self.key_parse.load(Ordering::Relaxed),
            encryption_failed: self.encryption_failed.load(Ordering::Relaxed),
            emission_failed: self.emission_failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Messages accepted by `submit`
    pub submitted: u64,
    /// Messages emitted
    pub emitted: u64,
    /// Dropped: no key
    pub not_configured: u64,
    /// Dropped: unparsable key
    pub key_parse: u64,
    /// Dropped: transform failure
    pub encryption_failed: u64,
    /// Dropped: port failure
    pub emission_failed: u64,
    /// Aborted by shutdown before reaching an outcome
    pub cancelled: u64,
}

impl StatsSnapshot {
    /// All drops, any reason.
    pub fn dropped(&self) -> u64 {
        self.not_configured + self.key_parse + self.encryption_failed + self.emission_failed
    }

    /// Messages that reached a terminal outcome.
    pub fn completed(&self) -> u64 {
        self.emitted + self.dropped()
    }
}

/// State shared by every message task.
struct Shared<E: Environment> {
    gate: EncryptionGate,
    port: Arc<dyn EmissionPort>,
    audit: Arc<dyn AuditSink>,
    env: E,
    permits: Semaphore,
    stats: DispatchStats,
}

/// Receives messages and runs one isolated pipeline per message.
///
/// The dispatcher is the only component that holds plaintext and decides
/// to forward. It owns its tasks: [`Dispatcher::drain`] waits for them,
/// [`Dispatcher::shutdown`] aborts them.
pub struct Dispatcher<E: Environment> {
    shared: Arc<Shared<E>>,
    tasks: Mutex<JoinSet<()>>,
}

impl<E: Environment> Dispatcher<E> {
    /// Create a dispatcher.
    pub fn new(
        gate: EncryptionGate,
        port: Arc<dyn EmissionPort>,
        audit: Arc<dyn AuditSink>,
        env: E,
        config: DispatcherConfig,
    ) -> Self {
        let permits = config.max_in_flight.clamp(1, Semaphore::MAX_PERMITS);

        Self {
            shared: Arc::new(Shared {
                gate,
                port,
                audit,
                env,
                permits: Semaphore::new(permits),
                stats: DispatchStats::default(),
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// The gate this dispatcher checks.
    pub fn gate(&self) -> &EncryptionGate {
        &self.shared.gate
    }

    /// Accept a message and return immediately.
    ///
    /// The pipeline runs as its own task; its failure is recorded as that
    /// message's outcome and affects nothing else. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, message: InboundMessage) {
        self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            report_join_error(finished);
        }
        tasks.spawn(async move { shared.process(message).await });
    }

    /// Pipelines not yet reaped. Includes tasks waiting for a slot.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            report_join_error(finished);
        }
        tasks.len()
    }

    /// Running totals.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Wait until every submitted pipeline has finished, including ones
    /// submitted while draining.
    pub async fn drain(&self) {
        loop {
            let mut batch = self.take_tasks();
            if batch.is_empty() {
                return;
            }
            while let Some(finished) = batch.join_next().await {
                report_join_error(finished);
            }
        }
    }

    /// Abort every in-flight pipeline.
    ///
    /// Outcomes already recorded are unaffected. Aborted messages get no
    /// outcome record and are counted as cancelled. Returns how many were
    /// aborted.
    pub async fn shutdown(&self) -> usize {
        let mut batch = self.take_tasks();
        batch.abort_all();

        let mut cancelled = 0usize;
        while let Some(finished) = batch.join_next().await {
            match finished {
                Err(e) if e.is_cancelled() => cancelled += 1,
                other => report_join_error(other),
            }
        }

        self.shared.stats.cancelled.fetch_add(cancelled as u64, Ordering::Relaxed);
        tracing::info!(cancelled, "dispatcher shut down");
        cancelled
    }

    fn take_tasks(&self) -> JoinSet<()> {
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<E: Environment> Shared<E> {
    /// Run one message to its terminal outcome and record it.
    async fn process(&self, message: InboundMessage) {
        let started = self.env.now();
        let kind = message.kind();
        let sender = message.sender().to_string();
        let message_id = message.message_id();
        let received_at = message.received_at();

        let outcome = {
            let _permit = self.permits.acquire().await.ok();
            self.run_pipeline(message).await
        };

        self.stats.record(outcome);
        self.audit.record(&OutcomeRecord {
            kind,
            sender,
            message_id,
            received_at,
            outcome,
            timestamp_millis: self.env.wall_clock_millis(),
            elapsed: self.env.now() - started,
        });
    }

    async fn run_pipeline(&self, message: InboundMessage) -> Outcome {
        let gate = self.gate.clone();
        let sealing = tokio::task::spawn_blocking(move || check_and_seal(&gate, message));
        let event = match sealing.await {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "sealing failed");
                return Outcome::Dropped(DropReason::from(&e));
            },
            Err(e) => {
                tracing::error!(error = %e, "sealing task failed");
                return Outcome::Dropped(DropReason::EncryptionFailed);
            },
        };

        let emitted =
            AssertUnwindSafe(self.port.emit(event.event_kind(), &event)).catch_unwind().await;

        match emitted {
            Ok(Ok(())) => Outcome::Emitted,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "emission failed");
                Outcome::Dropped(DropReason::EmissionFailed)
            },
            Err(_) => {
                tracing::error!("emission port panicked");
                Outcome::Dropped(DropReason::EmissionFailed)
            },
        }
    }
}

/// Zero-trust: nothing is encrypted, let alone forwarded, without a key.
fn check_and_seal(
    gate: &EncryptionGate,
    message: InboundMessage,
) -> Result<OutboundEvent, GateError> {
    if !gate.is_configured() {
        message.discard();
        return Err(GateError::NotConfigured);
    }
    gate.seal(message)
}

fn report_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "message task panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::LazyLock, time::Duration};

    use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
    use sealpost_core::{KeyStore, KeyStoreError, MemoryKeyStore};
    use sealpost_crypto::DecryptionKey;

    use super::*;
    use crate::{audit::MemoryAudit, emitter::MemoryEmitter, system_env::SystemEnv};

    static KEY: LazyLock<DecryptionKey> = LazyLock::new(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        DecryptionKey::generate(&mut rng, 1024).unwrap()
    });

    /// Key store remembering which threads read it.
    #[derive(Default)]
    struct ThreadRecordingStore {
        inner: MemoryKeyStore,
        readers: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl KeyStore for ThreadRecordingStore {
        fn get(&self) -> Option<String> {
            self.readers.lock().unwrap().push(std::thread::current().id());
            self.inner.get()
        }

        fn set(&self, value: Option<String>) -> Result<(), KeyStoreError> {
            self.inner.set(value)
        }
    }

    fn text(body: &str) -> InboundMessage {
        InboundMessage::Text {
            sender: "+15550000".to_string(),
            received_at: 1,
            body: body.to_string(),
            sim_slot: None,
        }
    }

    fn dispatcher(
        store: Arc<MemoryKeyStore>,
        port: Arc<MemoryEmitter>,
        config: DispatcherConfig,
    ) -> (Dispatcher<SystemEnv>, Arc<MemoryAudit>) {
        let audit = Arc::new(MemoryAudit::new());
        let dispatcher =
            Dispatcher::new(EncryptionGate::new(store), port, audit.clone(), SystemEnv, config);
        (dispatcher, audit)
    }

    #[tokio::test]
    async fn stats_track_outcomes() {
        let store = Arc::new(MemoryKeyStore::new());
        let port = Arc::new(MemoryEmitter::new());
        let (dispatcher, _) = dispatcher(store.clone(), port, DispatcherConfig::default());

        dispatcher.submit(text("a"));
        dispatcher.drain().await;

        store.set(Some(KEY.public_key_pem().unwrap())).unwrap();
        dispatcher.submit(text("b"));
        dispatcher.submit(text(&"x".repeat(100)));
        dispatcher.drain().await;

        let stats = dispatcher.stats();
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.not_configured, 1);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.encryption_failed, 1);
        assert_eq!(stats.completed(), 3);
    }

    #[tokio::test]
    async fn zero_in_flight_limit_still_makes_progress() {
        let store = Arc::new(MemoryKeyStore::with_key(KEY.public_key_pem().unwrap()));
        let port = Arc::new(MemoryEmitter::new());
        let (dispatcher, audit) =
            dispatcher(store, port.clone(), DispatcherConfig { max_in_flight: 0 });

        for _ in 0..3 {
            dispatcher.submit(text("hi"));
        }
        dispatcher.drain().await;

        assert_eq!(audit.len(), 3);
        assert_eq!(port.len(), 3);
    }

    #[tokio::test]
    async fn shutdown_aborts_waiting_pipelines() {
        let store = Arc::new(MemoryKeyStore::with_key(KEY.public_key_pem().unwrap()));
        let port = Arc::new(MemoryEmitter::with_delay(Duration::from_secs(3600)));
        let (dispatcher, audit) =
            dispatcher(store, port.clone(), DispatcherConfig { max_in_flight: 2 });

        for _ in 0..5 {
            dispatcher.submit(text("hi"));
        }
        assert_eq!(dispatcher.in_flight(), 5);

        let cancelled = dispatcher.shutdown().await;

        assert_eq!(cancelled, 5);
        assert_eq!(dispatcher.in_flight(), 0);
        assert!(audit.is_empty());
        assert!(port.is_empty());
        assert_eq!(dispatcher.stats().cancelled, 5);
    }

    #[tokio::test]
    async fn shutdown_keeps_recorded_outcomes() {
        let store = Arc::new(MemoryKeyStore::new());
        let port = Arc::new(MemoryEmitter::new());
        let (dispatcher, audit) = dispatcher(store, port, DispatcherConfig::default());

        dispatcher.submit(text("a"));
        dispatcher.drain().await;
        assert_eq!(dispatcher.shutdown().await, 0);

        assert_eq!(audit.with_outcome(Outcome::Dropped(DropReason::NotConfigured)).len(), 1);
    }

    #[tokio::test]
    async fn key_store_is_never_read_on_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let store = Arc::new(ThreadRecordingStore::default());
        let port = Arc::new(MemoryEmitter::new());
        let audit = Arc::new(MemoryAudit::new());
        let dispatcher = Dispatcher::new(
            EncryptionGate::new(store.clone()),
            port.clone(),
            audit.clone(),
            SystemEnv,
            DispatcherConfig::default(),
        );

        dispatcher.submit(text("closed"));
        dispatcher.drain().await;
        store.set(Some(KEY.public_key_pem().unwrap())).unwrap();
        dispatcher.submit(text("open"));
        dispatcher.drain().await;

        assert_eq!(audit.with_outcome(Outcome::Dropped(DropReason::NotConfigured)).len(), 1);
        assert_eq!(port.len(), 1);

        let readers = store.readers.lock().unwrap();
        assert!(!readers.is_empty());
        assert!(readers.iter().all(|id| *id != runtime_thread));
    }
}
