//! Production Environment implementation using the system clock.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sealpost_core::env::Environment;

/// Production environment: monotonic `Instant` and wall-clock `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    /// A clock set before 1970 reports 0.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
    }
}
