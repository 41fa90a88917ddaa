//! Role-narrowed data scopes.
//!
//! A `Principal` is the scope an actor's queries and mutations are filtered
//! through. An empty component is unscoped. Principals are only ever derived
//! with [`Principal::for_role`]; the derivation fails closed, mapping every
//! role without an explicit grant to the deny sentinel.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Reserved component value of the deny sentinel.
///
/// Record identifiers are generated ULIDs and never contain NUL, so this
/// value cannot match any stored record.
pub const DENY_ALL: &str = "\u{0}deny";

/// Data-access scope derived from an actor and its role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    user_id: String,
    realm_id: String,
}

impl Principal {
    /// Creates a principal scoped to the given user and realm.
    #[must_use]
    pub fn new(user_id: impl Into<String>, realm_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            realm_id: realm_id.into(),
        }
    }

    /// Creates the fully unscoped principal (global visibility).
    #[must_use]
    pub fn unscoped() -> Self {
        Self::new("", "")
    }

    /// Creates the sentinel principal that matches no record.
    #[must_use]
    pub fn deny() -> Self {
        Self::new(DENY_ALL, DENY_ALL)
    }

    /// Narrows this principal according to `role`.
    ///
    /// - `User` keeps both components
    /// - `Admin` keeps only the realm component
    /// - `Sysadmin` clears both components
    /// - anything else yields the deny sentinel
    #[must_use]
    pub fn for_role(&self, role: Role) -> Self {
        match role {
            Role::User => self.clone(),
            Role::Admin => Self::new("", self.realm_id.clone()),
            Role::Sysadmin => Self::unscoped(),
            Role::None | Role::Unknown => Self::deny(),
        }
    }

    /// Returns the user component, or `None` when unscoped.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        (!self.user_id.is_empty()).then_some(self.user_id.as_str())
    }

    /// Returns the realm component, or `None` when unscoped.
    #[must_use]
    pub fn realm_id(&self) -> Option<&str> {
        (!self.realm_id.is_empty()).then_some(self.realm_id.as_str())
    }

    /// Returns true if this principal grants global visibility.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.user_id.is_empty() && self.realm_id.is_empty()
    }

    /// Returns true if this is the deny sentinel.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        self.user_id == DENY_ALL || self.realm_id == DENY_ALL
    }

    /// Returns true if a record owned by `realm_id` (and optionally by
    /// `user_id`) falls inside this scope.
    ///
    /// A user-scoped principal never matches records without a user owner.
    #[must_use]
    pub fn matches(&self, realm_id: &str, user_id: Option<&str>) -> bool {
        if self.is_deny() {
            return false;
        }
        if self.realm_id().is_some_and(|scope| scope != realm_id) {
            return false;
        }
        match (self.user_id(), user_id) {
            (None, _) => true,
            (Some(scope), Some(owner)) => scope == owner,
            (Some(_), None) => false,
        }
    }
}
