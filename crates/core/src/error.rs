//! Core error types for resource and store operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

use crate::types::{ObjectKey, Subresource};

/// Core error type for resource store operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("resource '{key}' not found")]
    NotFound { key: ObjectKey },

    #[error("conflict updating {target} of '{key}': {reason}")]
    Conflict {
        key: ObjectKey,
        target: Subresource,
        reason: String,
    },

    #[error("store operation '{operation}' failed: {reason}")]
    StoreFailed { operation: String, reason: String },

    #[error("invalid patch: {reason}")]
    InvalidPatch { reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(key: impl Into<ObjectKey>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a conflict error.
    pub fn conflict(key: impl Into<ObjectKey>, target: Subresource, reason: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.into(),
            target,
            reason: reason.into(),
        }
    }

    /// Create a store failure error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid patch error.
    pub fn invalid_patch(reason: impl Into<String>) -> Self {
        Self::InvalidPatch {
            reason: reason.into(),
        }
    }

    /// Whether this error reports a missing resource.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
