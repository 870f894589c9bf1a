//! Domain layer for testdeck.
//!
//! Holds the three building blocks of a dashboard session and the
//! boundaries they talk through:
//!
//! - [`artifact`]: the project's artifact tree with single-node selection
//! - [`session`]: the append-only session log and request lifecycle state
//! - [`engine`]: the generation engine contract
//! - [`config`]: `config.toml` model

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;

// Re-export common error type
pub use error::{Result, TestdeckError};
