//! Role-based decision table for administrative operations.
//!
//! Every resource service routes its operations through [`authorize`]. Each
//! role has its own arm; the denied roles have theirs, so a role without an
//! explicit grant can never fall through to access.

use crate::actor::Actor;
use crate::error::AccessError;
use crate::role::Role;

/// What an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Global administration (realm lifecycle). Sysadmin only.
    System,
    /// An administrative collection or record inside a realm.
    Realm,
    /// A user record the actor may touch only when it is their own.
    SelfRecord(&'a str),
}

/// Decides whether `actor` may perform `action` on `scope` within `realm_id`.
///
/// # Errors
///
/// Returns the reason for denial. Anonymous and unrecognized roles produce
/// distinct errors.
pub fn authorize(
    actor: &Actor,
    realm_id: &str,
    action: &str,
    scope: Scope<'_>,
) -> Result<(), AccessError> {
    if let Some(denial) = actor.denial() {
        return Err(denial);
    }

    match actor.role() {
        Role::User => match scope {
            Scope::SelfRecord(target_id) if actor.is_self(realm_id, target_id) => Ok(()),
            Scope::SelfRecord(target_id) => Err(AccessError::NotSelf {
                target_id: target_id.to_string(),
            }),
            Scope::Realm | Scope::System => Err(forbidden(actor, action)),
        },
        Role::Admin => match scope {
            Scope::System => Err(forbidden(actor, action)),
            Scope::Realm | Scope::SelfRecord(_) if actor.realm_id() == realm_id => Ok(()),
            Scope::Realm | Scope::SelfRecord(_) => Err(AccessError::RealmMismatch {
                actor_realm: actor.realm_id().to_string(),
                target_realm: realm_id.to_string(),
            }),
        },
        Role::Sysadmin => Ok(()),
        Role::None => Err(AccessError::Anonymous),
        Role::Unknown => Err(AccessError::UnrecognizedRole),
    }
}

/// Decides whether `actor` may assign `role` to a record.
///
/// Actors may never grant a role more privileged than their own.
///
/// # Errors
///
/// Returns `Forbidden` when the grant would escalate privilege.
pub fn authorize_grant(actor: &Actor, role: Role) -> Result<(), AccessError> {
    if role.privilege() > actor.role().privilege() {
        return Err(forbidden(actor, &format!("grant role '{role}'")));
    }
    Ok(())
}

fn forbidden(actor: &Actor, action: &str) -> AccessError {
    AccessError::Forbidden {
        role: actor.role(),
        action: action.to_string(),
    }
}
