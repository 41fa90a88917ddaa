//! Directory of realms, OAuth providers, users, daemons, and API keys.
//!
//! This crate provides:
//! - Directory records and their create/update inputs
//! - Repository contracts for the persistence layer
//! - The `Lookup` view consulted by the session broker
//! - An in-memory store for tests and local development
//! - Role-enforced administrative services

pub mod error;
pub mod lookup;
pub mod memory;
pub mod model;
pub mod repository;
pub mod service;

pub use error::DirectoryError;
pub use lookup::{Lookup, LookupStore, RepositoryLookup};
pub use memory::{DirectorySeed, MemoryDirectory};
pub use model::{
    ApiKey, Daemon, DaemonUpdate, NewDaemon, NewProvider, NewRealm, NewUser, Provider,
    ProviderKind, ProviderUpdate, Realm, RealmUpdate, User, UserUpdate,
};
pub use repository::{
    ApiKeyRepository, DaemonRepository, ProviderRepository, RealmRepository, UserRepository,
};
pub use service::{DaemonService, ProviderService, RealmService, UserService};
