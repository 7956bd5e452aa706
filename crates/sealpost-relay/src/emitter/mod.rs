//! Emission port.
//!
//! The boundary between the relay and the remote collector. The relay hands
//! over a sealed event and learns only success or failure; retry and backoff
//! belong to the implementation behind this trait.

mod chaotic;
mod jsonl;
mod memory;

use async_trait::async_trait;
pub use chaotic::ChaoticEmitter;
pub use jsonl::{EmittedLine, JsonlEmitter};
pub use memory::MemoryEmitter;
use sealpost_core::{EventKind, OutboundEvent};
use thiserror::Error;

/// Delivery failures reported by an emission port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// Network or file I/O failed
    #[error("transport error: {0}")]
    Transport(String),

    /// The collector refused the event
    #[error("collector rejected event: {0}")]
    Rejected(String),

    /// The event could not be encoded for the wire
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Delivers sealed events to the remote collector.
///
/// Must be Send + Sync: one port instance serves every in-flight message.
///
/// # Invariants
///
/// - `event` has already passed the encryption gate
/// - A returned error is final for this message; the relay does not retry
#[async_trait]
pub trait EmissionPort: Send + Sync + 'static {
    /// Deliver one event. May suspend on I/O.
    async fn emit(&self, kind: EventKind, event: &OutboundEvent) -> Result<(), EmitError>;
}
