//! The authenticated caller of an administrative operation.

use crate::error::AccessError;
use crate::principal::Principal;
use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Represents the caller of an administrative operation.
///
/// Actors are passed explicitly to every service operation. A valid actor has
/// a non-empty user ID, a non-empty realm ID, and a granted role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The caller's user (or daemon) ID.
    user_id: String,
    /// The realm the caller belongs to.
    realm_id: String,
    /// The caller's role.
    role: Role,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub fn new(user_id: impl Into<String>, realm_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            realm_id: realm_id.into(),
            role,
        }
    }

    /// Creates the unauthenticated actor.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("", "", Role::None)
    }

    /// Returns the caller's user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the caller's realm ID.
    #[must_use]
    pub fn realm_id(&self) -> &str {
        &self.realm_id
    }

    /// Returns the caller's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns true if every field is populated and the role is granted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.user_id.is_empty() && !self.realm_id.is_empty() && self.role.is_granted()
    }

    /// Returns true if the target record is the actor's own record.
    #[must_use]
    pub fn is_self(&self, realm_id: &str, user_id: &str) -> bool {
        !self.user_id.is_empty() && self.realm_id == realm_id && self.user_id == user_id
    }

    /// Derives the data-access scope of this actor.
    ///
    /// Invalid actors always receive the deny sentinel.
    #[must_use]
    pub fn principal(&self) -> Principal {
        if !self.is_valid() {
            return Principal::deny();
        }
        Principal::new(self.user_id.clone(), self.realm_id.clone()).for_role(self.role)
    }

    /// Returns the denial for an actor whose role grants nothing.
    ///
    /// Anonymous and unrecognized roles produce distinct errors so audit logs
    /// can tell them apart. Returns `None` for granted roles with all fields
    /// populated.
    #[must_use]
    pub fn denial(&self) -> Option<AccessError> {
        match self.role {
            Role::None => Some(AccessError::Anonymous),
            Role::Unknown => Some(AccessError::UnrecognizedRole),
            Role::User | Role::Admin | Role::Sysadmin if !self.is_valid() => {
                Some(AccessError::InvalidActor {
                    role: self.role,
                })
            }
            Role::User | Role::Admin | Role::Sysadmin => None,
        }
    }
}
