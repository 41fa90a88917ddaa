//! Error types for the access crate.
//!
//! `AccessError` describes why an actor was denied. The variants are distinct
//! so audit logging can tell them apart; callers outside the service boundary
//! only ever learn that access was denied.

use crate::role::Role;
use std::fmt;

/// Reasons an actor is denied access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The caller is not authenticated.
    Anonymous,
    /// The caller's role is outside the known enumeration.
    UnrecognizedRole,
    /// The caller has a granted role but is missing a user or realm ID.
    InvalidActor { role: Role },
    /// The caller's role does not permit the operation at all.
    Forbidden { role: Role, action: String },
    /// The target record belongs to a different realm.
    RealmMismatch {
        actor_realm: String,
        target_realm: String,
    },
    /// The target record is not the caller's own record.
    NotSelf { target_id: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "access denied: anonymous actor"),
            Self::UnrecognizedRole => write!(f, "access denied: unrecognized role"),
            Self::InvalidActor { role } => {
                write!(f, "access denied: incomplete actor with role '{role}'")
            }
            Self::Forbidden { role, action } => {
                write!(f, "access denied: role '{role}' may not {action}")
            }
            Self::RealmMismatch {
                actor_realm,
                target_realm,
            } => {
                write!(
                    f,
                    "access denied: actor realm '{actor_realm}' does not match '{target_realm}'"
                )
            }
            Self::NotSelf { target_id } => {
                write!(f, "access denied: '{target_id}' is not the actor's own record")
            }
        }
    }
}

impl std::error::Error for AccessError {}
