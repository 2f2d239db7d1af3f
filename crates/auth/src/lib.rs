//! `heritage-auth`: identity storage and navigation access control.
//!
//! No HTTP here; the request client and the
//! UI shell both consume it through [`IdentityProvider`].

pub mod gate;
pub mod identity;
pub mod provider;
pub mod requirement;
pub mod roles;
pub mod routes;
pub mod store;

pub use gate::{decide, explain, GateDecision, GatePaths, NavigationExplanation, NavigationGate, RedirectKind};
pub use identity::{parse_identity, serialize_identity, IdentityParseError, IdentityRecord};
pub use provider::{FallbackIdentity, IdentityProvider, SessionIdentity, StaticIdentity};
pub use requirement::AuthRequirement;
pub use roles::{Role, UnknownRole};
pub use routes::{RouteDescriptor, RouteTable, HOME_PATH, LOGIN_PATH};
pub use store::{FileStorage, IdentityStore, MemoryStorage, StorageError, StorageScope, IDENTITY_KEY};
