//! Chaotic emission wrapper for fault injection testing
//!
//! Wraps another port and randomly fails deliveries, to verify that emission
//! failures stay confined to the message they hit.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sealpost_core::{EventKind, OutboundEvent};

use super::{EmissionPort, EmitError};

/// Emission port wrapper that randomly injects failures
///
/// Delegates to an underlying port but fails a fraction of calls based on a
/// configured failure rate. The RNG is seeded, so a given seed fails the same
/// sequence of calls. The order calls reach the RNG still depends on task
/// scheduling.
pub struct ChaoticEmitter<P: EmissionPort> {
    inner: P,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state and call counters
    state: Mutex<ChaosState>,
}

struct ChaosState {
    rng: ChaoticRng,
    attempts: usize,
    injected: usize,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator: fast and reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    /// Check if we should fail (returns true with probability = `failure_rate`)
    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<P: EmissionPort> ChaoticEmitter<P> {
    /// Create a new chaotic wrapper
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: P, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: P, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            state: Mutex::new(ChaosState { rng: ChaoticRng::new(seed), attempts: 0, injected: 0 }),
        }
    }

    /// Underlying port (for checking what actually got through).
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Total number of emit calls attempted.
    pub fn attempt_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).attempts
    }

    /// Number of calls failed by injection.
    pub fn injected_failures(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).injected
    }

    /// Count the attempt and decide whether to fail it
    fn should_fail(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.attempts += 1;
        let fail = state.rng.should_fail(self.failure_rate);
        if fail {
            state.injected += 1;
        }
        fail
    }
}

#[async_trait]
impl<P: EmissionPort> EmissionPort for ChaoticEmitter<P> {
    async fn emit(&self, kind: EventKind, event: &OutboundEvent) -> Result<(), EmitError> {
        if self.should_fail() {
            return Err(EmitError::Transport("chaotic failure injection".to_string()));
        }
        self.inner.emit(kind, event).await
    }
}
