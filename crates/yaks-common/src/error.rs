//! Error types for the YAKS operator
//!
//! Errors carry enough context (test name, resource kind) to be useful in
//! the controller's structured logs.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for YAKS operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Validation error for Test specs
    #[error("validation error for {test}: {message}")]
    Validation {
        /// Name of the Test with invalid configuration
        test: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Optimistic concurrency conflict that outlived the retry budget
    #[error("conflict updating {test} after {attempts} attempts")]
    Conflict {
        /// Name of the Test whose status could not be written
        test: String,
        /// Number of write attempts made
        attempts: u32,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "startup")
        context: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            test: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error with Test context
    pub fn validation_for(test: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            test: test.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a conflict error for a Test status write
    pub fn conflict(test: impl Into<String>, attempts: u32) -> Self {
        Self::Conflict {
            test: test.into(),
            attempts,
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether the error is a write conflict
    ///
    /// True for an HTTP 409 from the API server and for a conflict that
    /// exhausted the status write retries.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 409,
            Self::Conflict { .. } => true,
            _ => false,
        }
    }

    /// Short label used for the `error_type` metric attribute
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Kube { .. } => "kube",
            Self::Validation { .. } => "validation",
            Self::Serialization { .. } => "serialization",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
