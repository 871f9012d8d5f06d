//! Error types for plinth.
//!
//! This module provides a unified error type [`PlinthError`] for all plinth
//! operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Construction**: resolving a model to a handler and synthesizing its
//!   prototype. These always abort record/gateway creation.
//! - **Request**: schema validation and handler execution failures. These are
//!   contained to a single request; the gateway keeps serving.
//! - **Client**: transport failures seen by [`PredictClient`].
//! - **Store**: missing keys or versions in the external object store.
//!
//! # Example
//!
//! ```rust
//! use plinth::error::{PlinthError, Result};
//!
//! fn check_name(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(PlinthError::InvalidConfig {
//!             field: "name".into(),
//!             reason: "must not be empty".into(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! fn handle_error(err: &PlinthError) {
//!     if err.is_client_error() {
//!         println!("bad request: {}", err);
//!     } else {
//!         println!("server-side failure: {}", err);
//!     }
//! }
//! ```
//!
//! [`PredictClient`]: crate::client::PredictClient

use std::io;
use thiserror::Error;

/// Main error type for plinth operations.
#[derive(Error, Debug)]
pub enum PlinthError {
    // Construction errors
    #[error("No handler registered for model type: {0}")]
    UnsupportedModel(String),

    #[error("Cannot build a prototype from {data_type}: {reason}")]
    InvalidPrototype { data_type: String, reason: String },

    // Request-time errors
    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Handler prediction failed: {0}")]
    HandlerExecution(String),

    // Client-side errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Store errors
    #[error("Key not found in store: {0}")]
    KeyNotFound(String),

    #[error("Version not found in store: {key}@{version}")]
    VersionNotFound { key: String, version: String },

    // Gateway errors
    #[error("Endpoint already registered: {0}")]
    EndpointExists(String),

    // Configuration errors
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // External errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlinthError {
    /// Short machine-parseable kind tag, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PlinthError::UnsupportedModel(_) => "unsupported_model",
            PlinthError::InvalidPrototype { .. } => "invalid_prototype",
            PlinthError::SchemaValidation(_) => "validation",
            PlinthError::HandlerExecution(_) => "handler",
            PlinthError::Transport(_) => "transport",
            PlinthError::KeyNotFound(_) | PlinthError::VersionNotFound { .. } => "not_found",
            PlinthError::EndpointExists(_) => "endpoint_exists",
            PlinthError::InvalidConfig { .. } => "config",
            PlinthError::Serialization(_) => "serialization",
            PlinthError::Io(_) => "io",
            PlinthError::Internal(_) => "internal",
        }
    }

    /// Whether this error is the caller's fault rather than the service's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlinthError::SchemaValidation(_)
                | PlinthError::KeyNotFound(_)
                | PlinthError::VersionNotFound { .. }
        )
    }

    /// HTTP status code this error maps to on the serving surface.
    pub fn to_status_code(&self) -> u16 {
        match self {
            PlinthError::SchemaValidation(_) => 422,
            PlinthError::KeyNotFound(_) | PlinthError::VersionNotFound { .. } => 404,
            PlinthError::EndpointExists(_) => 409,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for PlinthError {
    fn from(e: serde_json::Error) -> Self {
        PlinthError::Serialization(e.to_string())
    }
}

/// Result type alias for plinth operations.
pub type Result<T> = std::result::Result<T, PlinthError>;
