//! buffer channel

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Channel, StreamChannel};
use crate::waiter::Waiter;

const DEFAULT_BLOCK_SIZE: usize = 4096;

struct State {
    buf: Vec<u8>,
    ofs: usize,
    open: bool,
}

/// A growable byte stream. Writers append, readers consume from a running
/// offset; once the offset passes the halfway point the consumed prefix is
/// dropped so the buffer doesn't grow without bound.
pub struct BufferChannel {
    state: Mutex<State>,
    cv: Condvar,
    block_size: AtomicUsize,
}

impl BufferChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                buf: Vec::new(),
                ofs: 0,
                open: true,
            }),
            cv: Condvar::new(),
            block_size: AtomicUsize::new(DEFAULT_BLOCK_SIZE),
        }
    }

    /// Append `src`. Returns false iff the channel is closed.
    pub fn write(&self, src: &[u8]) -> bool {
        let mut state = self.state.lock();
        if !state.open {
            return false;
        }
        state.buf.extend_from_slice(src);
        if state.ofs < state.buf.len() {
            self.cv.notify_all();
        }
        true
    }

    /// Drop all buffered bytes but keep the channel open.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.buf.clear();
        state.ofs = 0;
    }
}

impl Default for BufferChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter for BufferChannel {
    fn wait_for(&self, t: Duration) -> bool {
        let mut state = self.state.lock();
        if state.open && state.ofs == state.buf.len() && !t.is_zero() {
            let deadline = Instant::now() + t;
            loop {
                if !state.open || state.ofs < state.buf.len() {
                    break;
                }
                if Instant::now() >= deadline {
                    break;
                }
                let _ = self.cv.wait_until(&mut state, deadline);
            }
        }
        !state.open || state.ofs < state.buf.len()
    }
}

impl Channel for BufferChannel {
    fn close(&self) {
        let mut state = self.state.lock();
        state.buf.clear();
        state.ofs = 0;
        state.open = false;
        self.cv.notify_all();
    }

    fn is_closed(&self) -> bool {
        !self.state.lock().open
    }
}

impl StreamChannel for BufferChannel {
    fn read(&self, dst: &mut [u8]) -> usize {
        if dst.is_empty() {
            return 0;
        }
        let mut state = self.state.lock();
        if !state.open {
            return 0;
        }
        let available = state.buf.len() - state.ofs;
        let n = available.min(dst.len());
        dst[..n].copy_from_slice(&state.buf[state.ofs..state.ofs + n]);
        state.ofs += n;
        if state.ofs == state.buf.len() {
            state.buf.clear();
            state.ofs = 0;
        } else if 2 * state.ofs >= state.buf.len() {
            state.buf.drain(..state.ofs);
            state.ofs = 0;
        }
        n
    }

    fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Relaxed)
    }

    fn set_block_size(&self, n: usize) {
        self.block_size.store(n, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_conservation_write_then_read() {
        let chan = BufferChannel::new();
        chan.set_block_size(5);
        assert!(!chan.wait_for(Duration::from_millis(10)));

        assert!(chan.write(b"Hello"));
        assert!(chan.write(b"World"));
        assert!(chan.wait_for(Duration::from_millis(10)));

        let mut s = Vec::new();
        let n = chan.append(&mut s);
        assert_eq!(n, 10);
        assert_eq!(s, b"HelloWorld");
        assert!(!chan.wait_for(Duration::from_millis(10)));
    }

    #[test]
    fn compaction_does_not_drop_bytes() {
        let chan = BufferChannel::new();
        chan.set_block_size(1);
        chan.write(b"abcdef");
        let mut out = Vec::new();
        let mut dst = [0u8; 1];
        loop {
            let n = chan.read(&mut dst);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&dst[..n]);
        }
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn close_drains_to_zero_and_stays_closed() {
        let chan = BufferChannel::new();
        chan.write(b"pending");
        chan.close();
        assert!(chan.wait_for(Duration::from_millis(10)));
        assert!(chan.is_closed());
        let mut dst = [0u8; 16];
        assert_eq!(chan.read(&mut dst), 0);
    }

    #[test]
    fn read_echo_line_oriented_handler_shape() {
        let chan = BufferChannel::new();
        chan.set_block_size(5);
        chan.write(b"Hello world\n");
        let mut acc = Vec::new();
        loop {
            chan.append(&mut acc);
            if acc.contains(&b'\n') {
                break;
            }
        }
        assert_eq!(acc, b"Hello world\n");
    }
}
