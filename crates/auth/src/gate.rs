use std::sync::Arc;

use serde::Serialize;

use crate::identity::IdentityRecord;
use crate::provider::IdentityProvider;
use crate::routes::{RouteDescriptor, RouteTable, HOME_PATH, LOGIN_PATH};
use crate::{AuthRequirement, Role};

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "path", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    RedirectTo(String),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            GateDecision::Allow => None,
            GateDecision::RedirectTo(path) => Some(path),
        }
    }
}

/// Fixed redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    pub login: String,
    pub home: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            home: HOME_PATH.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision explanation (audit trail)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    /// Signed-in user asked for the login page.
    AlreadyAuthenticated,
    /// Route needs an identity and there is none.
    Unauthenticated,
    /// Identity present but its role is below the route's requirement.
    InsufficientRole,
}

/// Why a navigation decision was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationExplanation {
    pub target: String,
    pub requirement: AuthRequirement,
    pub role: Option<Role>,
    pub decision: GateDecision,
    pub redirect_kind: Option<RedirectKind>,
    pub reason: String,
}

/// Explain the decision for navigating to `target`.
///
/// - No IO
/// - No panics
/// - Authentication is settled before any role comparison
pub fn explain(
    target: &RouteDescriptor,
    identity: Option<&IdentityRecord>,
    paths: &GatePaths,
) -> NavigationExplanation {
    let requirement = target.auth_requirement;
    let role = identity.map(|i| i.role);
    let explanation = |decision, redirect_kind, reason: String| NavigationExplanation {
        target: target.path.clone(),
        requirement,
        role,
        decision,
        redirect_kind,
        reason,
    };

    if !requirement.requires_identity() {
        return if identity.is_some() && target.path == paths.login {
            explanation(
                GateDecision::RedirectTo(paths.home.clone()),
                Some(RedirectKind::AlreadyAuthenticated),
                "already signed in; login page is skipped".to_string(),
            )
        } else {
            explanation(GateDecision::Allow, None, "route is public".to_string())
        };
    }

    let Some(identity) = identity else {
        return explanation(
            GateDecision::RedirectTo(paths.login.clone()),
            Some(RedirectKind::Unauthenticated),
            format!("route requires '{requirement}' but no one is signed in"),
        );
    };

    if !requirement.is_satisfied_by(identity.role) {
        return explanation(
            GateDecision::RedirectTo(paths.home.clone()),
            Some(RedirectKind::InsufficientRole),
            format!("role '{}' does not satisfy '{requirement}'", identity.role),
        );
    }

    explanation(
        GateDecision::Allow,
        None,
        format!("role '{}' satisfies '{requirement}'", identity.role),
    )
}

/// Decide whether the transition `current -> target` may proceed.
///
/// The origin route does not influence the outcome; it is accepted so callers
/// can hand over the transition as-is.
pub fn decide(
    target: &RouteDescriptor,
    _current: Option<&RouteDescriptor>,
    identity: Option<&IdentityRecord>,
    paths: &GatePaths,
) -> GateDecision {
    explain(target, identity, paths).decision
}

/// Navigation gate bound to an identity provider and the registered routes.
///
/// Stateless across calls: each evaluation reads the identity afresh.
#[derive(Clone)]
pub struct NavigationGate {
    provider: Arc<dyn IdentityProvider>,
    routes: RouteTable,
    paths: GatePaths,
}

impl NavigationGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, routes: RouteTable) -> Self {
        Self {
            provider,
            routes,
            paths: GatePaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: GatePaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    /// Evaluate a transition between route descriptors.
    pub fn evaluate(&self, target: &RouteDescriptor, current: Option<&RouteDescriptor>) -> GateDecision {
        let identity = self.provider.identity();
        let explanation = explain(target, identity.as_ref(), &self.paths);

        tracing::debug!(
            from = current.map(|r| r.path.as_str()).unwrap_or(""),
            to = %explanation.target,
            requirement = %explanation.requirement,
            decision = ?explanation.decision,
            reason = %explanation.reason,
            "navigation evaluated"
        );

        explanation.decision
    }

    /// Evaluate a transition given raw paths, resolving them against the
    /// registered routes.
    pub fn navigate(&self, to: &str, from: Option<&str>) -> GateDecision {
        let target = self.routes.resolve(to);
        let current = from.map(|p| self.routes.resolve(p));
        self.evaluate(&target, current.as_ref())
    }

    /// Full explanation for the current identity, for audit/debug output.
    pub fn explain(&self, to: &str) -> NavigationExplanation {
        let target = self.routes.resolve(to);
        explain(&target, self.provider.identity().as_ref(), &self.paths)
    }
}
