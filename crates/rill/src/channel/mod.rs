//! channel
//!
//! The readiness-producing event source hierarchy: a sealed family of
//! concrete channels behind three small traits keyed by read shape.
//! `Channel` carries the concurrency contract shared by every variant;
//! `MessageChannel` and `StreamChannel` describe the two possible read
//! shapes (a readiness-only channel, like [`TimerChannel`], implements
//! neither).

pub mod buffer;
pub mod generator;
pub mod process;
pub mod queue;
pub mod timer;
pub mod value;

pub use buffer::BufferChannel;
pub use generator::GeneratorChannel;
pub use process::{StreamProcess, TextProcess};
pub use queue::QueueChannel;
pub use timer::TimerChannel;
pub use value::ValueChannel;

use crate::support::ScopeGuard;
use crate::waiter::Waiter;

/// Shared operations every concrete channel supports, plus the concurrency
/// discipline ([`is_synchronous`](Channel::is_synchronous)) that tells
/// [`crate::Dispatch`] whether to poll the channel or hand it a worker
/// thread.
pub trait Channel: Waiter + Send + Sync {
    /// Close the channel. Idempotent; unblocks every current and future
    /// waiter.
    fn close(&self);

    /// Once true, stays true for the life of the channel.
    fn is_closed(&self) -> bool;

    /// Synchronous channels must be polled externally (`poll` is cheap);
    /// asynchronous channels can block efficiently in `wait`. Defaults to
    /// asynchronous.
    fn is_synchronous(&self) -> bool {
        false
    }
}

/// A channel whose read shape is "each ready event produces one `T`".
pub trait MessageChannel: Channel {
    type Item: Send;

    /// Consume and return the pending value, or `None` if there is nothing
    /// to read (including: the channel is closed).
    fn read(&self) -> Option<Self::Item>;
}

/// A channel whose read shape is "ready means bytes are available".
pub trait StreamChannel: Channel {
    /// Copy up to `dst.len()` bytes into `dst`, returning the number
    /// copied. Returns 0 once closed.
    fn read(&self, dst: &mut [u8]) -> usize;

    fn block_size(&self) -> usize;

    fn set_block_size(&self, n: usize);

    /// Grow `dst` by at most [`block_size`](StreamChannel::block_size) and
    /// shrink it back to the bytes actually read.
    fn append(&self, dst: &mut Vec<u8>) -> usize {
        let pos = dst.len();
        let block = self.block_size().max(1);
        dst.resize(pos + block, 0);
        let n = self.read(&mut dst[pos..]);
        let _guard = ScopeGuard::new(|| dst.truncate(pos + n));
        n
    }

    /// Loop `wait` + `append` until closed, returning everything read.
    fn read_all(&self) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            self.wait();
            if self.is_closed() {
                break;
            }
            self.append(&mut out);
        }
        out
    }
}
