//! Authorization model for gatehouse.
//!
//! This crate provides:
//! - Role enumeration (`Role`), ordered by privilege
//! - The authenticated caller of an administrative operation (`Actor`)
//! - Role-narrowed data scopes (`Principal`)
//! - The per-role decision table (`authorize`)
//! - Access denial error types
//!
//! # Scoping Model
//!
//! Every administrative operation receives the `Actor` explicitly. The actor's
//! role narrows its identity into a `Principal`, which is then used to filter
//! the records the operation may read or mutate:
//! - `user` sees only its own record in its own realm
//! - `admin` sees every record in its realm
//! - `sysadmin` sees everything
//! - anything else sees nothing
//!
//! # Example
//!
//! ```
//! use gatehouse_access::{Actor, Role};
//!
//! let actor = Actor::new("usr_1", "acme", Role::Admin);
//! let principal = actor.principal();
//!
//! assert!(principal.matches("acme", Some("usr_2")));
//! assert!(!principal.matches("globex", Some("usr_2")));
//! ```

pub mod actor;
pub mod error;
pub mod policy;
pub mod principal;
pub mod role;

// Re-export main types at crate root
pub use actor::Actor;
pub use error::AccessError;
pub use policy::{Scope, authorize, authorize_grant};
pub use principal::Principal;
pub use role::Role;
