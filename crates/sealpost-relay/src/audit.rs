//! Terminal outcomes and the audit sink.
//!
//! Every submitted message ends in exactly one [`Outcome`], reported once to
//! the [`AuditSink`]. Records carry routing metadata only: no plaintext and
//! no ciphertext.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use sealpost_core::{GateError, MessageId, MessageKind};

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// No key configured when the message was checked
    NotConfigured,
    /// Configured key could not be parsed
    KeyParse,
    /// The encryption transform failed (e.g. oversized input)
    EncryptionFailed,
    /// The emission port reported a delivery failure
    EmissionFailed,
}

impl DropReason {
    /// Stable name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::KeyParse => "key_parse",
            Self::EncryptionFailed => "encryption_failed",
            Self::EmissionFailed => "emission_failed",
        }
    }

    /// True for both key parse and transform failures.
    pub fn is_encryption_failure(self) -> bool {
        matches!(self, Self::KeyParse | Self::EncryptionFailed)
    }
}

impl From<&GateError> for DropReason {
    fn from(err: &GateError) -> Self {
        match err {
            GateError::NotConfigured => Self::NotConfigured,
            GateError::KeyParse(_) => Self::KeyParse,
            GateError::Encryption(_) => Self::EncryptionFailed,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Encrypted and accepted by the emission port
    Emitted,
    /// Discarded; the message is gone
    Dropped(DropReason),
}

impl Outcome {
    /// Drop reason, if dropped.
    pub fn drop_reason(self) -> Option<DropReason> {
        match self {
            Self::Emitted => None,
            Self::Dropped(reason) => Some(reason),
        }
    }
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Content kind of the message
    pub kind: MessageKind,
    /// Originating address
    pub sender: String,
    /// Best-effort correlation id
    pub message_id: MessageId,
    /// Receipt time of the message (ms since epoch)
    pub received_at: u64,
    /// What happened
    pub outcome: Outcome,
    /// When it happened (ms since epoch)
    pub timestamp_millis: u64,
    /// Time from acceptance to outcome
    pub elapsed: Duration,
}

/// Destination for terminal outcomes.
///
/// Called from message tasks concurrently; implementations must be cheap
/// and must not block on I/O.
pub trait AuditSink: Send + Sync + 'static {
    /// Report one terminal outcome.
    fn record(&self, record: &OutcomeRecord);
}

/// Audit sink writing one structured `tracing` event per outcome.
///
/// `Emitted` logs at info, drops at warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, record: &OutcomeRecord) {
        match record.outcome {
            Outcome::Emitted => tracing::info!(
                kind = %record.kind,
                sender = %record.sender,
                message_id = %record.message_id,
                outcome = "emitted",
                timestamp_ms = record.timestamp_millis,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "message forwarded"
            ),
            Outcome::Dropped(reason) => tracing::warn!(
                kind = %record.kind,
                sender = %record.sender,
                message_id = %record.message_id,
                outcome = "dropped",
                reason = %reason,
                timestamp_ms = record.timestamp_millis,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "message dropped"
            ),
        }
    }
}

/// Audit sink collecting records in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl MemoryAudit {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far, in recording order.
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of records so far.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records whose outcome equals `outcome`.
    pub fn with_outcome(&self, outcome: Outcome) -> Vec<OutcomeRecord> {
        self.records().into_iter().filter(|r| r.outcome == outcome).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: &OutcomeRecord) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
    }
}
