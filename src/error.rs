//! Error types for PdfChat
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for PdfChat operations
///
/// Every variant is recoverable: the front end catches it at the user action
/// that triggered it and renders the message. Nothing here is fatal to an
/// interactive session.
#[derive(Error, Debug)]
pub enum PdfChatError {
    /// No valid session is available for an authenticated operation
    #[error("Authentication error: {0}")]
    AuthRequired(String),

    /// Local input rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// The identity provider rejected the request
    #[error("{0}")]
    Auth(String),

    /// The request never produced an HTTP response (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// The upload endpoint answered with a non-success status
    #[error("{message}")]
    Upload {
        /// Message extracted from the backend error body
        message: String,
    },

    /// The chat endpoint answered with a non-success status
    #[error("{message}")]
    Chat {
        /// Message extracted from the backend error body
        message: String,
    },

    /// A success response did not match the expected contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for PdfChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need to branch on the failure kind use [`error_kind`].
pub type Result<T> = anyhow::Result<T>;

/// Borrow the [`PdfChatError`] carried by an `anyhow::Error`, if any.
pub fn error_kind(err: &anyhow::Error) -> Option<&PdfChatError> {
    err.downcast_ref::<PdfChatError>()
}

/// Render an error the way the chat transcript shows it.
///
/// Typed errors render their own message; foreign errors fall back to the
/// full `anyhow` chain so context is not lost.
pub fn user_message(err: &anyhow::Error) -> String {
    match error_kind(err) {
        Some(kind) => kind.to_string(),
        None => format!("{:#}", err),
    }
}
