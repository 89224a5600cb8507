//! rill
//!
//! Event channels, a readiness dispatcher, and a work-stealing threadpool.
//!
//! [`channel`] defines the [`Waiter`](waiter::Waiter) and
//! [`Channel`](channel::Channel) hierarchy: timer, buffer, queue, value,
//! generator and subprocess channels, each either polled synchronously or
//! blocked on efficiently from a dedicated thread. [`dispatch`] binds
//! channels to handlers and runs them until the first close or handler
//! failure. [`pool`] is a general purpose work-stealing job executor,
//! independent of dispatch.

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod support;
pub mod waiter;

pub use channel::Channel;
pub use dispatch::{ChannelId, Dispatch, DispatchResult};
pub use error::{BoxError, DuplicateRegistration};
pub use pool::ThreadPool;
pub use waiter::Waiter;
