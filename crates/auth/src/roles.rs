use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of an authenticated user.
///
/// Roles form a total order by privilege: `Standard < Admin < SuperAdmin`.
/// The serialized form is the label the backend issues at login; the English
/// names are accepted as aliases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "普通用户", alias = "standard", alias = "Standard")]
    Standard,
    #[serde(rename = "管理员", alias = "admin", alias = "Admin")]
    Admin,
    #[serde(rename = "超级管理员", alias = "super_admin", alias = "SuperAdmin")]
    SuperAdmin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Standard, Role::Admin, Role::SuperAdmin];

    /// Backend label for this role.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Standard => "普通用户",
            Role::Admin => "管理员",
            Role::SuperAdmin => "超级管理员",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Whether this role grants at least the privileges of `other`.
    pub fn includes(&self, other: Role) -> bool {
        *self >= other
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s || role.label() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
