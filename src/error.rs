//! Error types for the redirect reconciliation system.
//!
//! This module provides the error hierarchy for every stage of a redirect's
//! lifecycle: configuration, validation, the remote API, reconciliation,
//! and local state management.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the redirect reconciliation system.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A desired-state document violates an invariant.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Remote API errors.
    #[error("redirect.pizza API error: {0}")]
    Api(#[from] ApiError),

    /// Lifecycle errors raised by the reconciliation engine.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest file could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Two redirects share the same local name.
    #[error("Duplicate redirect name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// A redirect name is not declared in the manifest.
    #[error("Redirect '{name}' is not declared in the manifest")]
    UnknownRedirect {
        /// The unknown name.
        name: String,
    },
}

/// A desired-state document violates a structural or cross-field rule.
///
/// Raised before any network call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}{}", .field.as_ref().map(|f| format!("{f}: ")).unwrap_or_default(), .message)]
pub struct ValidationError {
    /// Field path that failed validation, if any.
    pub field: Option<String>,
    /// The rule that was violated.
    pub message: String,
}

/// Errors talking to the remote redirect API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent (DNS, refused connection, transport timeout).
    #[error("Cannot execute http request: {message}")]
    Transport {
        /// Underlying transport failure.
        message: String,
    },

    /// The request was answered with a status other than the expected one.
    #[error("{operation}: expected status code {expected} but got {status}: {body}")]
    UnexpectedStatus {
        /// Operation that was attempted.
        operation: &'static str,
        /// The single status code that counts as success.
        expected: u16,
        /// Status code actually returned.
        status: u16,
        /// Raw response body, or a placeholder if unreadable.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// The outgoing document could not be serialized.
    #[error("Cannot encode request body: {message}")]
    Encode {
        /// Description of the serialization failure.
        message: String,
    },
}

/// Failures decoding a remote response body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The outer `{"data": ...}` envelope could not be parsed.
    #[error("Cannot unmarshal response json: {message}")]
    Envelope {
        /// Underlying parse failure.
        message: String,
    },

    /// The `destination` field matched neither accepted shape.
    #[error(
        "destination field is neither a list of destinations ({as_list}) nor a single url ({as_string})"
    )]
    Destination {
        /// Failure decoding as an array of destination objects.
        as_list: String,
        /// Failure decoding as a bare string.
        as_string: String,
    },
}

/// Lifecycle errors raised by the reconciliation engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Create was called on a resource that already has a remote id.
    #[error("Redirect already exists remotely with id {id}")]
    AlreadyCreated {
        /// The existing remote id.
        id: String,
    },

    /// An operation that needs a remote id was called without one.
    #[error("Cannot {operation} a redirect that has no remote id")]
    NotCreated {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Reconciliation failed for a named resource.
    #[error("Failed to reconcile redirect '{name}': {reason}")]
    ResourceReconcileFailed {
        /// Name of the resource.
        name: String,
        /// Reason for failure.
        reason: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Reading or writing the state file failed.
    #[error("State storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Result type alias for redirect operations.
pub type Result<T> = std::result::Result<T, RedirectError>;

/// Result type alias for remote API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ValidationError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the HTTP status if this is an unexpected-status error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl StateError {
    /// Creates a storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}
