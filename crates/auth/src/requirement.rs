use serde::{Deserialize, Serialize};

use crate::Role;

/// Access requirement declared by a route.
///
/// Ordered from weakest to strongest. Routes that omit the requirement in
/// their metadata default to [`AuthRequirement::None`].
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    #[default]
    None,
    Authenticated,
    Admin,
    SuperAdmin,
}

impl AuthRequirement {
    pub const ALL: [AuthRequirement; 4] = [
        AuthRequirement::None,
        AuthRequirement::Authenticated,
        AuthRequirement::Admin,
        AuthRequirement::SuperAdmin,
    ];

    /// Whether a signed-in identity is needed at all.
    pub fn requires_identity(&self) -> bool {
        *self != AuthRequirement::None
    }

    /// Lowest role that satisfies this requirement, if any role is needed.
    pub fn minimum_role(&self) -> Option<Role> {
        match self {
            AuthRequirement::None => None,
            AuthRequirement::Authenticated => Some(Role::Standard),
            AuthRequirement::Admin => Some(Role::Admin),
            AuthRequirement::SuperAdmin => Some(Role::SuperAdmin),
        }
    }

    pub fn is_satisfied_by(&self, role: Role) -> bool {
        self.minimum_role().is_none_or(|min| role.includes(min))
    }

    /// Map legacy route-meta flags (`requiresAuth`, `requiresAdmin`,
    /// `requiresSuperAdmin`) onto a single requirement. The strongest flag wins.
    pub fn from_flags(requires_auth: bool, requires_admin: bool, requires_super_admin: bool) -> Self {
        if !requires_auth {
            AuthRequirement::None
        } else if requires_super_admin {
            AuthRequirement::SuperAdmin
        } else if requires_admin {
            AuthRequirement::Admin
        } else {
            AuthRequirement::Authenticated
        }
    }
}

impl core::fmt::Display for AuthRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AuthRequirement::None => "none",
            AuthRequirement::Authenticated => "authenticated",
            AuthRequirement::Admin => "admin",
            AuthRequirement::SuperAdmin => "super_admin",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfaction_matrix() {
        use AuthRequirement as Req;

        for role in Role::ALL {
            assert!(Req::None.is_satisfied_by(role));
            assert!(Req::Authenticated.is_satisfied_by(role));
        }
        assert!(!Req::Admin.is_satisfied_by(Role::Standard));
        assert!(Req::Admin.is_satisfied_by(Role::Admin));
        assert!(Req::Admin.is_satisfied_by(Role::SuperAdmin));
        assert!(!Req::SuperAdmin.is_satisfied_by(Role::Admin));
        assert!(Req::SuperAdmin.is_satisfied_by(Role::SuperAdmin));
    }

    #[test]
    fn legacy_flags_without_auth_mean_public() {
        assert_eq!(AuthRequirement::from_flags(false, true, true), AuthRequirement::None);
        assert_eq!(AuthRequirement::from_flags(true, true, true), AuthRequirement::SuperAdmin);
        assert_eq!(AuthRequirement::from_flags(true, true, false), AuthRequirement::Admin);
        assert_eq!(AuthRequirement::from_flags(true, false, false), AuthRequirement::Authenticated);
    }
}
