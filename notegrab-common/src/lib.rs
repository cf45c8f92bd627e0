//! Common types and utilities shared across notegrab crates.
//!
//! This crate holds the shared error type and the tracing initialiser used by
//! every binary and integration test in the workspace. It stays small so the
//! lower crates (`notegrab-collect`, `notegrab-markov`) can depend on it
//! without dragging in the HTTP stack.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`NotegrabError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use notegrab_common::NotegrabError;
//!
//! let err = NotegrabError::UserNotFound {
//!     username: "alice".into(),
//!     host: "misskey.example".into(),
//! };
//! assert_eq!(err.to_string(), "User not found: @alice@misskey.example");
//! ```

pub mod observability;

/// Error types used across notegrab.
#[derive(thiserror::Error, Debug)]
pub enum NotegrabError {
    /// The remote API failed or returned something we could not use.
    #[error("API error: {0}")]
    Api(String),

    /// The username lookup came back empty.
    #[error("User not found: @{username}@{host}")]
    UserNotFound { username: String, host: String },

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A Markov model could not be trained, loaded, or sampled.
    #[error("Markov model error: {0}")]
    Markov(String),
}

/// Convenient alias for results that use [`NotegrabError`].
pub type Result<T> = std::result::Result<T, NotegrabError>;
