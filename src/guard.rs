use crate::{
    routes::{HOME_PATH, RoleSet, RouteNode},
    session::Session,
};

/// DenyReason
///
/// Why a guard refused entry. Only ever logged; the user just sees the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The session carries no usable role (logged out, or not loaded yet).
    NoRole,
    /// The route was registered without any required role.
    NoRequiredRoles,
    RoleMismatch,
}

/// AccessDecision
///
/// Computed fresh on every navigation and never cached, since the session may change
/// between two navigations.
#[derive(Debug, Clone, Copy)]
pub enum AccessDecision<'n> {
    Allow(&'n RouteNode),
    Deny {
        redirect: &'static str,
        reason: DenyReason,
    },
}

impl AccessDecision<'_> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow(_))
    }
}

/// Guard
///
/// A pure, synchronous decision over `(session, node)`: no I/O, no mutation. The
/// session is `None` while the identity store has not been read.
pub trait Guard {
    fn decide<'n>(&self, session: Option<&Session>, node: &'n RouteNode) -> AccessDecision<'n>;
}

/// RoleGuard
///
/// Enforces a partition's required-role set. Denials always redirect to `fallback`.
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard<'a> {
    required: Option<&'a RoleSet>,
    fallback: &'static str,
}

impl<'a> RoleGuard<'a> {
    pub fn new(required: Option<&'a RoleSet>, fallback: &'static str) -> Self {
        Self { required, fallback }
    }
}

impl Guard for RoleGuard<'_> {
    fn decide<'n>(&self, session: Option<&Session>, node: &'n RouteNode) -> AccessDecision<'n> {
        let deny = |reason| AccessDecision::Deny {
            redirect: self.fallback,
            reason,
        };

        let Some(role) = session.and_then(Session::effective_role) else {
            return deny(DenyReason::NoRole);
        };
        let required = match self.required {
            Some(required) if !required.is_empty() => required,
            _ => return deny(DenyReason::NoRequiredRoles),
        };

        if required.contains(&role) {
            AccessDecision::Allow(node)
        } else {
            deny(DenyReason::RoleMismatch)
        }
    }
}

/// PublicGuard
///
/// Pass-through for publicly registered routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicGuard;

impl Guard for PublicGuard {
    fn decide<'n>(&self, _session: Option<&Session>, node: &'n RouteNode) -> AccessDecision<'n> {
        AccessDecision::Allow(node)
    }
}

/// decide
///
/// Free-standing form of the role check: `Allow(node)` iff the session has a role and
/// that role is in `required`; otherwise `Deny` with a redirect home.
pub fn decide<'n>(
    session: Option<&Session>,
    required: Option<&RoleSet>,
    node: &'n RouteNode,
) -> AccessDecision<'n> {
    RoleGuard::new(required, HOME_PATH).decide(session, node)
}
