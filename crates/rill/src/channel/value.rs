//! value channel

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Channel, MessageChannel};
use crate::waiter::Waiter;

struct State<T> {
    value: Option<T>,
    dirty: bool,
    open: bool,
}

/// Holds only the most recent value written. Writes that don't change the
/// value (by `PartialEq`) don't mark the channel dirty, so a burst of
/// identical writes coalesces into a single readiness event.
pub struct ValueChannel<T> {
    state: Mutex<State<T>>,
    cv: Condvar,
}

impl<T: PartialEq + Send> ValueChannel<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                value: None,
                dirty: false,
                open: true,
            }),
            cv: Condvar::new(),
        }
    }

    /// Store `v`. A no-op once closed; marks dirty only if `v` differs from
    /// whatever is currently stored.
    pub fn write(&self, v: T) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        let changed = state.value.as_ref() != Some(&v);
        state.value = Some(v);
        if changed {
            state.dirty = true;
            self.cv.notify_all();
        }
    }
}

impl<T: PartialEq + Send> Default for ValueChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq + Send> Waiter for ValueChannel<T> {
    fn wait_for(&self, t: Duration) -> bool {
        let mut state = self.state.lock();
        if state.open && !state.dirty && !t.is_zero() {
            let deadline = Instant::now() + t;
            loop {
                if !state.open || state.dirty {
                    break;
                }
                if Instant::now() >= deadline {
                    break;
                }
                let _ = self.cv.wait_until(&mut state, deadline);
            }
        }
        !state.open || state.dirty
    }
}

impl<T: PartialEq + Send> Channel for ValueChannel<T> {
    fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.cv.notify_all();
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().open
    }
}

impl<T: PartialEq + Clone + Send> MessageChannel for ValueChannel<T> {
    type Item = T;

    fn read(&self) -> Option<T> {
        let mut state = self.state.lock();
        if !state.open {
            return None;
        }
        state.dirty = false;
        state.value.clone()
    }
}
