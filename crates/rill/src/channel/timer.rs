//! timer channel

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::Channel;
use crate::waiter::Waiter;

struct State {
    next_tick: Instant,
    open: bool,
}

/// Fires readiness every `delta`. Readiness-only: it carries no value, so it
/// implements neither [`MessageChannel`](super::MessageChannel) nor
/// [`StreamChannel`](super::StreamChannel).
///
/// Asynchronous by default; wrap in a type that overrides
/// [`Channel::is_synchronous`] to poll it instead (see the `SyncTimer`
/// pattern used in the dispatch tests).
pub struct TimerChannel {
    delta: Duration,
    state: Mutex<State>,
    cv: Condvar,
}

impl TimerChannel {
    pub fn new(delta: Duration) -> Self {
        let now = Instant::now();
        Self {
            delta,
            state: Mutex::new(State {
                next_tick: now + delta,
                open: true,
            }),
            cv: Condvar::new(),
        }
    }

    /// Discard any ticks already due, so the next wait starts a fresh
    /// interval instead of firing immediately.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        let now = Instant::now();
        if now < state.next_tick {
            return;
        }
        if self.delta.is_zero() {
            state.next_tick = now;
            return;
        }
        let elapsed = now.duration_since(state.next_tick);
        let skip = (elapsed.as_nanos() / self.delta.as_nanos()) as u32;
        state.next_tick += self.delta * (skip + 1);
    }
}

impl Waiter for TimerChannel {
    fn wait_for(&self, t: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.open {
            return true;
        }
        let now = Instant::now();
        if state.next_tick <= now {
            state.next_tick += self.delta;
            return true;
        }
        if t.is_zero() {
            return false;
        }
        let remaining = state.next_tick - now;
        if t < remaining {
            let deadline = now + t;
            loop {
                if !state.open {
                    return true;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                let _ = self.cv.wait_until(&mut state, deadline);
            }
        }
        let deadline = now + remaining;
        loop {
            if !state.open {
                return true;
            }
            if Instant::now() >= deadline {
                state.next_tick += self.delta;
                return true;
            }
            let _ = self.cv.wait_until(&mut state, deadline);
        }
    }
}

impl Channel for TimerChannel {
    fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.cv.notify_all();
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fires_no_sooner_than_delta() {
        let chan = TimerChannel::new(Duration::from_millis(25));
        assert!(!chan.wait_for(Duration::from_millis(1)));
        assert!(chan.wait_for(Duration::from_millis(100)));
    }

    #[test]
    fn repeated_ticks_after_sleeping_past_delta() {
        let chan = TimerChannel::new(Duration::from_millis(25));
        thread::sleep(Duration::from_millis(150));
        assert!(chan.wait_for(Duration::from_millis(1)));
        assert!(chan.wait_for(Duration::from_millis(1)));
    }

    #[test]
    fn close_makes_every_wait_ready() {
        let chan = TimerChannel::new(Duration::from_millis(25));
        chan.close();
        assert!(chan.wait_for(Duration::from_millis(10)));
        assert!(chan.is_closed());
    }

    #[test]
    fn close_unblocks_a_waiting_thread() {
        let chan = Arc::new(TimerChannel::new(Duration::from_secs(10)));
        let waiter = Arc::clone(&chan);
        let handle = thread::spawn(move || waiter.wait_for(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        chan.close();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn cadence_over_many_ticks() {
        let chan = TimerChannel::new(Duration::from_millis(2));
        let mut ticks = 0;
        let start = Instant::now();
        while ticks < 50 {
            if chan.wait_for(Duration::from_millis(50)) {
                ticks += 1;
            }
        }
        let elapsed = start.elapsed();
        // 50 ticks of 2ms each should take roughly 100ms, generously bounded.
        assert!(elapsed >= Duration::from_millis(60));
        assert!(elapsed <= Duration::from_millis(500));
    }
}
