//! Role-enforced administrative services.
//!
//! Every operation takes the calling `Actor` explicitly and is checked
//! against the decision table in `gatehouse_access::policy` before any record
//! is read or written. Denials are logged with their reason and returned as
//! `DirectoryError::AccessDenied`.

mod daemon;
mod provider;
mod realm;
mod user;

pub use daemon::DaemonService;
pub use provider::ProviderService;
pub use realm::RealmService;
pub use user::UserService;

use crate::error::DirectoryError;
use gatehouse_access::{Actor, Role, Scope, authorize, authorize_grant};
use rootcause::prelude::Report;
use tracing::warn;

fn check(
    actor: &Actor,
    realm_id: &str,
    action: &str,
    scope: Scope<'_>,
) -> Result<(), Report<DirectoryError>> {
    authorize(actor, realm_id, action, scope).map_err(|reason| {
        warn!(
            actor = %actor.user_id(),
            role = %actor.role(),
            realm_id = %realm_id,
            action,
            error = %reason,
            "access denied"
        );
        DirectoryError::AccessDenied(reason).into()
    })
}

fn check_grant(actor: &Actor, role: Role) -> Result<(), Report<DirectoryError>> {
    authorize_grant(actor, role).map_err(|reason| {
        warn!(
            actor = %actor.user_id(),
            role = %actor.role(),
            granted = %role,
            error = %reason,
            "role grant denied"
        );
        DirectoryError::AccessDenied(reason).into()
    })
}

fn require(field: &str, value: &str) -> Result<(), DirectoryError> {
    if value.trim().is_empty() {
        return Err(DirectoryError::validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}
