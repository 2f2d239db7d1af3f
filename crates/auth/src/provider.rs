//! Identity providers: the capability the gate and the request client are
//! constructed with, instead of reading ambient storage themselves.

use crate::identity::IdentityRecord;
use crate::store::IdentityStore;

/// Source of the current identity.
pub trait IdentityProvider: Send + Sync {
    fn identity(&self) -> Option<IdentityRecord>;
}

/// Session scope only. This is what navigation decisions use.
#[derive(Clone)]
pub struct SessionIdentity(IdentityStore);

/// Session scope, falling back to the persistent scope. This is what request
/// header injection uses.
#[derive(Clone)]
pub struct FallbackIdentity(IdentityStore);

impl IdentityStore {
    pub fn session_provider(&self) -> SessionIdentity {
        SessionIdentity(self.clone())
    }

    pub fn fallback_provider(&self) -> FallbackIdentity {
        FallbackIdentity(self.clone())
    }
}

impl IdentityProvider for SessionIdentity {
    fn identity(&self) -> Option<IdentityRecord> {
        self.0.read_identity()
    }
}

impl IdentityProvider for FallbackIdentity {
    fn identity(&self) -> Option<IdentityRecord> {
        self.0.read_identity_with_fallback()
    }
}

/// Fixed identity (or none). Useful for tests and service contexts.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<IdentityRecord>);

impl StaticIdentity {
    pub fn signed_in(record: IdentityRecord) -> Self {
        Self(Some(record))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Option<IdentityRecord> {
        self.0.clone()
    }
}
