//! Error types.
//!
//! Reactive operations themselves never fail: invalid targets and readonly
//! writes are reported no-ops, and a panicking computation propagates as a
//! panic. Errors only come from moving plain data in and out of JSON.

use thiserror::Error;

/// Errors produced by this crate.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The input was not valid JSON.
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A target could not be deserialized into the requested type.
    #[error("failed to deserialize target: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Only objects and arrays can become targets.
    #[error("expected a JSON object or array, found {found}")]
    NotAContainer {
        /// The JSON type that was found instead.
        found: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
