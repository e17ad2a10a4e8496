//! Typed error handling for the invoice-sync client
//!
//! Every failure the client can observe is represented here so callers can
//! handle errors specifically rather than dealing with a generic boxed error.
//!
//! # Error Categories
//!
//! - [`SyncError::Io`]: the file bytes could not be read
//! - [`SyncError::Network`]: the remote store is unreachable — callers must
//!   treat this as "cannot verify", never as "does not exist"
//! - [`SyncError::Conflict`]: an invoice with this digest already exists
//! - [`SyncError::Server`]: any other non-2xx response, body kept verbatim
//! - [`SyncError::InvalidPatch`]: a field patch that does not touch exactly
//!   one recognized mutable field
//! - [`SyncError::InvalidFile`]: the file fails local validation before upload
//! - [`SyncError::Config`]: configuration parsing failures
//!
//! No error in this crate is fatal to the process; all are recoverable at the
//! call site.

use crate::core::hasher::Digest;
use std::fmt;

/// The main error type for invoice-sync operations
#[derive(Debug)]
pub enum SyncError {
    /// The source bytes could not be read
    Io(std::io::Error),

    /// The remote store is unreachable
    Network { message: String },

    /// An invoice with this digest already exists
    Conflict { digest: Digest },

    /// Non-2xx response from the remote store, body surfaced verbatim
    Server { status: u16, body: String },

    /// A patch that does not modify exactly one recognized field
    InvalidPatch { message: String },

    /// A file rejected by local validation (extension, size)
    InvalidFile { reason: String },

    /// Configuration parsing or loading failure
    Config { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Io(e) => write!(f, "Failed to read file bytes: {}", e),
            SyncError::Network { message } => {
                write!(f, "Remote store unreachable: {}", message)
            }
            SyncError::Conflict { digest } => {
                write!(f, "Invoice with digest '{}' already exists", digest)
            }
            SyncError::Server { status, body } => {
                write!(f, "Server error ({}): {}", status, body)
            }
            SyncError::InvalidPatch { message } => {
                write!(f, "Invalid patch: {}", message)
            }
            SyncError::InvalidFile { reason } => {
                write!(f, "Invalid file: {}", reason)
            }
            SyncError::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl SyncError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Io(_) => "IO_ERROR",
            SyncError::Network { .. } => "NETWORK_ERROR",
            SyncError::Conflict { .. } => "INVOICE_ALREADY_EXISTS",
            SyncError::Server { .. } => "SERVER_ERROR",
            SyncError::InvalidPatch { .. } => "INVALID_PATCH",
            SyncError::InvalidFile { .. } => "INVALID_FILE",
            SyncError::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether the caller may retry the same operation without changing it
    ///
    /// Conflicts and invalid patches are contract violations; retrying the
    /// identical request cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Io(_) | SyncError::Network { .. } | SyncError::Server { .. }
        )
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        // Status-bearing failures are mapped to Server at the call site where
        // the body is still available; everything reaching this conversion is
        // a transport-level failure.
        SyncError::Network {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::Config {
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for invoice-sync operations
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// Tests
// =============================================================================
