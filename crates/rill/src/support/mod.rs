//! support
//!
//! Small RAII helpers shared by the rest of the crate.

mod resource;
mod scope_guard;

pub use resource::Resource;
pub use scope_guard::ScopeGuard;
