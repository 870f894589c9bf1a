//! Subcommand implementations.

pub mod ask;
pub mod config;
pub mod repl;
pub mod tree;
