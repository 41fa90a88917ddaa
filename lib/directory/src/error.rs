//! Error types for the directory crate.
//!
//! Repository and lookup contracts return `DirectoryError` directly; the
//! services wrap it in a rootcause `Report`.

use gatehouse_access::AccessError;
use std::fmt;

/// Errors from directory lookups, repositories, and services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The record does not exist.
    NotFound { entity: &'static str, key: String },
    /// The actor may not perform the operation.
    AccessDenied(AccessError),
    /// The record exists but is disabled.
    Disabled { entity: &'static str, key: String },
    /// The record exists but has expired.
    Expired { entity: &'static str, key: String },
    /// The record violates an entity invariant.
    Validation { reason: String },
    /// The persistence layer failed.
    Store { details: String },
}

impl DirectoryError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} '{key}' not found"),
            Self::AccessDenied(reason) => write!(f, "{reason}"),
            Self::Disabled { entity, key } => write!(f, "{entity} '{key}' is disabled"),
            Self::Expired { entity, key } => write!(f, "{entity} '{key}' has expired"),
            Self::Validation { reason } => write!(f, "validation failed: {reason}"),
            Self::Store { details } => write!(f, "directory store error: {details}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<AccessError> for DirectoryError {
    fn from(err: AccessError) -> Self {
        Self::AccessDenied(err)
    }
}
