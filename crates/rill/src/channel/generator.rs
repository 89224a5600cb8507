//! generator channel

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{Channel, MessageChannel};
use crate::waiter::Waiter;

/// Pulls a value from a user function on demand. Synchronous: it is always
/// ready while open, so `Dispatch` polls it rather than spawning a worker
/// thread for it.
pub struct GeneratorChannel<T, F>
where
    F: FnMut() -> T + Send,
{
    open: AtomicBool,
    generate: Mutex<F>,
}

impl<T, F> GeneratorChannel<T, F>
where
    F: FnMut() -> T + Send,
{
    pub fn new(generate: F) -> Self {
        Self {
            open: AtomicBool::new(true),
            generate: Mutex::new(generate),
        }
    }
}

impl<T, F> Waiter for GeneratorChannel<T, F>
where
    F: FnMut() -> T + Send,
{
    fn wait_for(&self, _t: Duration) -> bool {
        true
    }
}

impl<T, F> Channel for GeneratorChannel<T, F>
where
    T: Send,
    F: FnMut() -> T + Send,
{
    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }

    fn is_synchronous(&self) -> bool {
        true
    }
}

impl<T, F> MessageChannel for GeneratorChannel<T, F>
where
    T: Send,
    F: FnMut() -> T + Send,
{
    type Item = T;

    fn read(&self) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        Some((self.generate.lock())())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_successive_values_until_closed() {
        let mut i = 0;
        let chan = GeneratorChannel::new(move || {
            i += 1;
            i
        });

        assert!(chan.wait_for(Duration::from_millis(10)));
        assert_eq!(chan.read(), Some(1));
        assert!(chan.wait_for(Duration::from_millis(10)));
        assert_eq!(chan.read(), Some(2));

        chan.close();
        assert!(chan.wait_for(Duration::from_millis(10)));
        assert!(chan.is_closed());
        assert_eq!(chan.read(), None);
    }
}
