//! Environment abstraction for deterministic testing.
//!
//! Decouples pipeline logic from the system clock. Production uses real
//! time; tests pin wall-clock readings so audit records are predictable.

use std::time::Duration;

/// Abstract environment providing monotonic and wall-clock time.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Methods are infallible
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; tests may use any
    /// ordered type with duration subtraction.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// Used to measure how long a message spent in the pipeline.
    fn now(&self) -> Self::Instant;

    /// Milliseconds since the Unix epoch.
    ///
    /// Stamped on every audit record.
    fn wall_clock_millis(&self) -> u64;
}
