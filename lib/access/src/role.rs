//! Role enumeration for administrative access control.
//!
//! Roles are ordered by privilege. The enumeration is closed; any serialized
//! value that does not name a known role becomes `Role::Unknown`, which is
//! denied everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative role of an actor.
///
/// - `None`: Unauthenticated caller, always denied
/// - `User`: Ordinary user, scoped to its own identity and realm
/// - `Admin`: Manager of a single realm
/// - `Sysadmin`: System-wide operator with no scoping at all
/// - `Unknown`: Any value outside the enumeration, always denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Role {
    /// Unauthenticated caller.
    #[default]
    None,
    /// Ordinary user with access to their own record.
    User,
    /// Realm manager with access to every record of their realm.
    Admin,
    /// System administrator with global access.
    Sysadmin,
    /// Unrecognized role value.
    Unknown,
}

impl Role {
    /// Returns the canonical lowercase name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::User => "user",
            Self::Admin => "admin",
            Self::Sysadmin => "sysadmin",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the privilege rank of the role.
    ///
    /// Denied roles (`None`, `Unknown`) share the lowest rank.
    #[must_use]
    pub const fn privilege(&self) -> u8 {
        match self {
            Self::None | Self::Unknown => 0,
            Self::User => 1,
            Self::Admin => 2,
            Self::Sysadmin => 3,
        }
    }

    /// Returns true if the role grants any access at all.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::User | Self::Admin | Self::Sysadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "user" => Self::User,
            "admin" => Self::Admin,
            "sysadmin" => Self::Sysadmin,
            _ => Self::Unknown,
        })
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

impl From<Role> for &'static str {
    fn from(role: Role) -> Self {
        role.as_str()
    }
}
