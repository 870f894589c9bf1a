//! Session hosting.
//!
//! A [`Session`] is the explicit per-conversation context; the
//! [`SessionRegistry`] keeps any number of them side by side.

mod context;
mod registry;

pub use context::{Session, SessionView};
pub use registry::SessionRegistry;
