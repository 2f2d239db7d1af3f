//! Route descriptors registered by the surrounding application.

use serde::{Deserialize, Serialize};

use heritage_core::{DomainError, DomainResult};

use crate::AuthRequirement;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// A registered route. Static for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub auth_requirement: AuthRequirement,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>, auth_requirement: AuthRequirement) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            auth_requirement,
        }
    }

    /// Descriptor for a path no route was registered for. Such paths carry no
    /// requirement.
    pub fn unregistered(path: impl Into<String>) -> Self {
        Self::new(path, "", AuthRequirement::None)
    }
}

/// Legacy route-meta flags as the web router declares them.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMeta {
    #[serde(default)]
    requires_auth: bool,
    #[serde(default)]
    requires_admin: bool,
    #[serde(default)]
    requires_super_admin: bool,
}

/// One entry of a route manifest: either an explicit `auth_requirement` or the
/// legacy `meta` flags.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    path: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    auth_requirement: Option<AuthRequirement>,
    #[serde(default)]
    meta: Option<LegacyMeta>,
}

impl From<ManifestEntry> for RouteDescriptor {
    fn from(entry: ManifestEntry) -> Self {
        let requirement = entry.auth_requirement.unwrap_or_else(|| {
            let meta = entry.meta.unwrap_or_default();
            AuthRequirement::from_flags(meta.requires_auth, meta.requires_admin, meta.requires_super_admin)
        });
        RouteDescriptor::new(entry.path, entry.name, requirement)
    }
}

/// Registered routes, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The routes the web application registers.
    pub fn application() -> Self {
        use AuthRequirement as Req;

        let routes = [
            (LOGIN_PATH, "Login", Req::None),
            (HOME_PATH, "Home", Req::Authenticated),
            ("/aigc", "AIGC", Req::Authenticated),
            ("/multimodal", "MultiModal", Req::Authenticated),
            ("/upload", "Upload", Req::Authenticated),
            ("/annotation", "Annotation", Req::Authenticated),
            ("/search", "Search", Req::Authenticated),
            ("/resource/detail", "ResourceDetail", Req::Authenticated),
            ("/dashboard", "Dashboard", Req::Admin),
            ("/users", "UserManagement", Req::SuperAdmin),
            ("/secondary-creation", "SecondaryCreation", Req::Authenticated),
            ("/messages", "Messages", Req::Authenticated),
        ];

        Self {
            routes: routes
                .into_iter()
                .map(|(path, name, req)| RouteDescriptor::new(path, name, req))
                .collect(),
        }
    }

    /// Load a JSON array of route entries.
    pub fn from_manifest(json: &str) -> DomainResult<Self> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("route manifest: {e}")))?;

        let mut table = Self::new();
        for entry in entries {
            table.register(entry.into())?;
        }
        Ok(table)
    }

    pub fn register(&mut self, route: RouteDescriptor) -> DomainResult<()> {
        if !route.path.starts_with('/') {
            return Err(DomainError::validation(format!(
                "route path '{}' must start with '/'",
                route.path
            )));
        }
        if self.get(&route.path).is_some() {
            return Err(DomainError::conflict(format!("route '{}' already registered", route.path)));
        }
        self.routes.push(route);
        Ok(())
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn get(&self, path: &str) -> Option<&RouteDescriptor> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| !r.name.is_empty() && r.name == name)
    }

    /// The descriptor for `path`, or an unregistered one with no requirement.
    pub fn resolve(&self, path: &str) -> RouteDescriptor {
        self.get(path)
            .cloned()
            .unwrap_or_else(|| RouteDescriptor::unregistered(normalize(path)))
    }
}

/// Strip query and fragment; drop a trailing slash except on the root.
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}
