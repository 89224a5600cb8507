//! queue channel

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Channel, MessageChannel};
use crate::waiter::Waiter;

struct State<T> {
    queue: VecDeque<T>,
    open: bool,
}

/// A FIFO message channel: each write enqueues, each read pops the front.
pub struct QueueChannel<T> {
    state: Mutex<State<T>>,
    cv: Condvar,
}

impl<T: Send> QueueChannel<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                open: true,
            }),
            cv: Condvar::new(),
        }
    }

    /// Enqueue `v`. A no-op once the channel is closed.
    pub fn write(&self, v: T) {
        let mut state = self.state.lock();
        if state.open {
            state.queue.push_back(v);
            self.cv.notify_all();
        }
    }
}

impl<T: Send> Default for QueueChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Waiter for QueueChannel<T> {
    fn wait_for(&self, t: Duration) -> bool {
        let mut state = self.state.lock();
        if state.open && state.queue.is_empty() && !t.is_zero() {
            let deadline = Instant::now() + t;
            loop {
                if !state.open || !state.queue.is_empty() {
                    break;
                }
                if Instant::now() >= deadline {
                    break;
                }
                let _ = self.cv.wait_until(&mut state, deadline);
            }
        }
        !state.open || !state.queue.is_empty()
    }
}

impl<T: Send> Channel for QueueChannel<T> {
    fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.cv.notify_all();
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().open
    }
}

impl<T: Send> MessageChannel for QueueChannel<T> {
    type Item = T;

    fn read(&self) -> Option<T> {
        let mut state = self.state.lock();
        if !state.open {
            return None;
        }
        state.queue.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_return_fifo_order() {
        let chan: QueueChannel<i32> = QueueChannel::new();
        assert!(!chan.wait_for(Duration::from_millis(10)));

        chan.write(1);
        chan.write(2);
        chan.write(3);

        assert!(chan.wait_for(Duration::from_millis(10)));
        assert_eq!(chan.read(), Some(1));
        assert_eq!(chan.read(), Some(2));
        assert_eq!(chan.read(), Some(3));
        assert!(!chan.wait_for(Duration::from_millis(10)));
    }

    #[test]
    fn close_makes_read_return_none() {
        let chan: QueueChannel<i32> = QueueChannel::new();
        chan.write(1);
        chan.close();
        assert!(chan.is_closed());
        assert_eq!(chan.read(), None);
    }
}
