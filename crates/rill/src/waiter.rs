//! waiter

use std::time::{Duration, Instant};

/// Abstract ability to test or await readiness with a timeout.
///
/// The four methods are defined in terms of each other; an implementer
/// overrides exactly one (almost always [`wait_for`](Waiter::wait_for)) and
/// gets the rest for free.
pub trait Waiter {
    /// Non-blocking readiness test. Equivalent to `wait_for(Duration::ZERO)`.
    fn poll(&self) -> bool {
        self.wait_for(Duration::ZERO)
    }

    /// Block until ready, with no timeout.
    fn wait(&self) {
        while !self.wait_for(Duration::from_secs(1)) {}
    }

    /// Block up to `t`. Returns whether the waiter became ready.
    ///
    /// A zero or negative duration must perform a non-blocking check and
    /// return immediately.
    fn wait_for(&self, t: Duration) -> bool {
        self.wait_until(Instant::now() + t)
    }

    /// Block until `deadline`. Returns whether the waiter became ready.
    fn wait_until(&self, deadline: Instant) -> bool {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.wait_for(remaining)
    }
}
