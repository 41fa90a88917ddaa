//! Opaque identifier generation.
//!
//! Session IDs and entity IDs are generated through the `IdGenerator` trait so
//! that services never accept caller-supplied identifiers and tests can inject
//! deterministic ones. The default generator uses ULID (Universally Unique
//! Lexicographically Sortable Identifier), which carries 80 bits of randomness.

use std::fmt;
use ulid::Ulid;

/// Produces collision-resistant, opaque identifiers.
///
/// Generated identifiers must be unguessable by third parties: they are used
/// as bearer session IDs as well as entity IDs.
pub trait IdGenerator: Send + Sync {
    /// Generates a new identifier.
    fn generate_id(&self) -> String;
}

/// ULID-backed identifier generator.
///
/// An optional prefix is joined to the ULID with an underscore, for example
/// `ses_01HZX3...`. Generated identifiers never contain `:`.
#[derive(Debug, Clone, Default)]
pub struct UlidGenerator {
    prefix: Option<&'static str>,
}

impl UlidGenerator {
    /// Creates a generator producing bare ULIDs.
    #[must_use]
    pub const fn new() -> Self {
        Self { prefix: None }
    }

    /// Creates a generator producing `{prefix}_{ulid}` identifiers.
    #[must_use]
    pub const fn with_prefix(prefix: &'static str) -> Self {
        Self {
            prefix: Some(prefix),
        }
    }

    /// Returns the configured prefix, if any.
    #[must_use]
    pub const fn prefix(&self) -> Option<&'static str> {
        self.prefix
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_id(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("{prefix}_{}", Ulid::new()),
            None => Ulid::new().to_string(),
        }
    }
}

impl fmt::Display for UlidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "ulid({prefix})"),
            None => write!(f, "ulid"),
        }
    }
}
