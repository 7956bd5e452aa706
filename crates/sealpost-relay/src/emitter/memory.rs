//! In-memory emission port for tests and simulation.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use sealpost_core::{EventKind, OutboundEvent};

use super::{EmissionPort, EmitError};

/// Emission port that records every call.
///
/// Optionally sleeps before recording, so concurrent pipelines overlap and
/// complete out of submission order.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    emitted: Mutex<Vec<(EventKind, OutboundEvent)>>,
    delay: Option<Duration>,
}

impl MemoryEmitter {
    /// Create an emitter that records immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an emitter that suspends for `delay` on every call.
    pub fn with_delay(delay: Duration) -> Self {
        Self { emitted: Mutex::new(Vec::new()), delay: Some(delay) }
    }

    /// Every `(kind, event)` accepted so far, in acceptance order.
    pub fn emitted(&self) -> Vec<(EventKind, OutboundEvent)> {
        self.emitted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of accepted events.
    pub fn len(&self) -> usize {
        self.emitted.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmissionPort for MemoryEmitter {
    async fn emit(&self, kind: EventKind, event: &OutboundEvent) -> Result<(), EmitError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.emitted.lock().unwrap_or_else(PoisonError::into_inner).push((kind, event.clone()));
        Ok(())
    }
}
