//! error

use std::error::Error as StdError;
use std::fmt;

/// Type-erased error payload carried by a fault, returned by a handler to
/// report a failure.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// `Dispatch::add` was called with a channel already owned by a dispatcher.
///
/// Raised immediately to the caller; it never becomes a fault.
#[derive(Debug, thiserror::Error)]
#[error("channel is already registered with a dispatcher")]
pub struct DuplicateRegistration;

/// A handler (or the generated read step in front of it) reported a failure.
///
/// Wraps an arbitrary boxed error so callers are free to use their own
/// error types; `rill` itself never constructs one except to carry a
/// `String` message where no richer error is available.
#[derive(Debug)]
pub struct HandlerError(pub String);

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for HandlerError {}
