//! Shared utilities for Handoff: logging, error types, helpers.
//!
//! This crate provides common infrastructure used across all Handoff components.

#![forbid(unsafe_code)]

pub mod error;
pub mod helpers;

pub use error::{Error, Result};
pub use helpers::{now_ms, snapshot_file_name};

/// Initialize tracing with a specific default level.
///
/// `RUST_LOG` takes precedence when set. Output goes to stderr, leaving
/// stdout to the chat.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
