//! Error types and result aliases for the Recall library.
//!
//! This module defines the core error type [`RecallError`] and the [`Result`] type alias
//! used throughout the library. Normal cache and context operations never fail: an
//! oversized item, an expired key or an unknown session are ordinary return values.
//! Only construction and configuration loading return `Result<T>`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecallError>;
