//! Centralized error types for the Chime core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to stable machine-readable codes
//! - Converts domain-specific errors into the application-wide type

use serde::Serialize;
use thiserror::Error;

use crate::connection::ConnectError;
use crate::platform::{AudioSinkError, DesktopNotifyError, StoreError};

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for diagnostics and shells.
    fn code(&self) -> &'static str;
}

impl ErrorCode for ConnectError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "invalid_hub_endpoint",
            Self::Handshake(_) => "hub_handshake_failed",
        }
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "storage_io_failed",
            Self::Serialize(_) => "storage_serialize_failed",
        }
    }
}

impl ErrorCode for AudioSinkError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "audio_output_unavailable",
            Self::Submit(_) => "audio_submit_failed",
        }
    }
}

impl ErrorCode for DesktopNotifyError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unsupported => "desktop_notifications_unsupported",
            Self::Post(_) => "desktop_post_failed",
        }
    }
}

/// Application-wide error type for Chime.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ChimeError {
    /// Hub connection failed (bad endpoint, rejected handshake).
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Preference persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error that should not occur in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChimeError {
    /// Returns a machine-readable error code for diagnostics and shells.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection_failed",
            Self::Storage(_) => "storage_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::connection::ConnectResult;
pub use crate::platform::StoreResult;

/// Convenient Result alias for application-wide operations.
pub type ChimeResult<T> = Result<T, ChimeError>;

impl From<ConnectError> for ChimeError {
    fn from(err: ConnectError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<StoreError> for ChimeError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
