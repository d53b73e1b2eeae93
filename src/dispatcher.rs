use std::{collections::BTreeMap, ptr, sync::Arc};

use tokio::sync::watch;

use crate::{
    error::ResolveError,
    guard::{AccessDecision, Guard, PublicGuard, RoleGuard},
    landing::landing_path,
    modules::{ModuleRef, ModuleResolver, ModuleState, RouteModule},
    routes::{Access, HOME_PATH, RoutePartition, RouteTable, normalize_path},
    session::{Session, SessionPhase, SessionReader},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// The guard denied the target.
    Unauthorized,
    /// One-time redirect of an authenticated session away from the generic root.
    Landing,
    /// Nothing in the table matches and no not-found page is registered.
    NotFound,
}

/// View
///
/// What the client should display after a navigation event.
#[derive(Debug, Clone)]
pub enum View {
    Render {
        path: String,
        module: Arc<RouteModule>,
        params: BTreeMap<String, String>,
    },
    /// Placeholder shown while the target's implementation is still resolving.
    Pending { path: String, module: ModuleRef },
    Redirect {
        from: String,
        to: String,
        reason: RedirectReason,
    },
    /// Explicit error view for a failed resolution. Stays until `Dispatcher::retry`.
    Failed {
        path: String,
        module: ModuleRef,
        error: ResolveError,
    },
    /// A newer navigation replaced this one before it settled.
    Superseded { path: String },
}

impl View {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            View::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }
}

fn view_for(
    path: &str,
    module: &ModuleRef,
    params: &BTreeMap<String, String>,
    state: ModuleState,
) -> View {
    match state {
        ModuleState::Resolved(implementation) => View::Render {
            path: path.to_string(),
            module: implementation,
            params: params.clone(),
        },
        ModuleState::Failed(error) => View::Failed {
            path: path.to_string(),
            module: module.clone(),
            error,
        },
        ModuleState::Unresolved | ModuleState::Resolving => View::Pending {
            path: path.to_string(),
            module: module.clone(),
        },
    }
}

/// ComposedRoutes
///
/// The navigable table for one session phase: the public partition plus, when
/// authenticated, the single partition owned by the session's role.
#[derive(Debug, Clone, Copy)]
pub struct ComposedRoutes<'t> {
    pub public: &'t RoutePartition,
    pub protected: Option<&'t RoutePartition>,
}

impl<'t> ComposedRoutes<'t> {
    pub fn for_phase(table: &'t RouteTable, phase: SessionPhase) -> Self {
        Self {
            public: table.public(),
            protected: phase.role().and_then(|role| table.partition(role)),
        }
    }

    pub fn partitions(&self) -> impl Iterator<Item = &'t RoutePartition> {
        std::iter::once(self.public).chain(self.protected)
    }

    pub fn is_mounted(&self, partition: &RoutePartition) -> bool {
        self.partitions().any(|mounted| ptr::eq(mounted, partition))
    }

    pub fn reachable_paths(&self) -> Vec<String> {
        self.partitions().flat_map(RoutePartition::paths).collect()
    }
}

#[derive(Debug)]
struct ActiveTarget {
    path: String,
    module: ModuleRef,
    params: BTreeMap<String, String>,
    generation: u64,
}

/// Dispatcher
///
/// Per-client navigation state machine over `NoSession`, `Unauthenticated` and
/// `Authenticated(role)`. It reads the session on every event but never writes it.
///
/// Navigation never waits on module resolution: an unresolved target yields
/// `View::Pending`, and `pending()` hands out a `PendingView` that can be awaited
/// separately.
pub struct Dispatcher {
    table: &'static RouteTable,
    resolver: Arc<ModuleResolver>,
    session: SessionReader,
    phase: SessionPhase,
    location: String,
    landing_issued: bool,
    generation: Arc<watch::Sender<u64>>,
    active: Option<ActiveTarget>,
}

impl Dispatcher {
    pub fn new(table: &'static RouteTable, resolver: Arc<ModuleResolver>, session: SessionReader) -> Self {
        Self {
            table,
            resolver,
            session,
            phase: SessionPhase::NoSession,
            location: HOME_PATH.to_string(),
            landing_issued: false,
            generation: Arc::new(watch::channel(0).0),
            active: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn table(&self) -> &'static RouteTable {
        self.table
    }

    pub fn composed(&self) -> ComposedRoutes<'static> {
        ComposedRoutes::for_phase(self.table, self.phase)
    }

    /// Re-reads the session and applies the landing rule to the current location.
    /// Call after the identity store publishes a change.
    pub fn sync_session(&mut self) -> Option<View> {
        self.observe();
        let from = self.location.clone();
        let to = self.landing_due(&from)?;
        Some(self.issue_landing(from, to))
    }

    /// Handles one navigation request.
    pub fn navigate(&mut self, requested: &str) -> View {
        let path = normalize_path(requested);
        let snapshot = self.observe();

        if let Some(to) = self.landing_due(&path) {
            return self.issue_landing(path, to);
        }

        let table = self.table;
        let (partition, matched) = table.lookup(&path);
        let (node, params) = match matched {
            Some(found) => (found.node, found.params),
            None => match table.not_found() {
                Some(node) => {
                    let params = BTreeMap::from([(
                        "*".to_string(),
                        path.trim_start_matches('/').to_string(),
                    )]);
                    (node, params)
                }
                None => return self.unmatched(path, partition, snapshot.as_ref()),
            },
        };

        let decision = match &partition.access {
            Access::Public => PublicGuard.decide(snapshot.as_ref(), node),
            Access::Restricted(roles) => {
                RoleGuard::new(Some(roles), HOME_PATH).decide(snapshot.as_ref(), node)
            }
        };

        match decision {
            AccessDecision::Allow(node) => {
                tracing::debug!(path = %path, module = %node.module, phase = self.phase.label(), "navigation allowed");
                self.activate(path, node.module.clone(), params)
            }
            AccessDecision::Deny { redirect, reason } => {
                tracing::info!(path = %path, ?reason, phase = self.phase.label(), redirect, "navigation denied");
                self.supersede();
                View::Redirect {
                    from: path,
                    to: redirect.to_string(),
                    reason: RedirectReason::Unauthorized,
                }
            }
        }
    }

    /// The view for the active target as of now, without re-running the guard.
    pub fn current_view(&self) -> Option<View> {
        let target = self.active.as_ref()?;
        let state = self.resolver.state(&target.module);
        Some(view_for(&target.path, &target.module, &target.params, state))
    }

    /// A handle to await the active target, if it is still resolving.
    pub fn pending(&self) -> Option<PendingView> {
        let target = self.active.as_ref()?;
        if self.resolver.state(&target.module).is_settled() {
            return None;
        }
        Some(PendingView {
            path: target.path.clone(),
            module: target.module.clone(),
            params: target.params.clone(),
            expected: target.generation,
            generation: Arc::clone(&self.generation),
            resolver: Arc::clone(&self.resolver),
        })
    }

    /// Retries a failed active target. `None` when there is nothing to retry.
    pub fn retry(&mut self) -> Option<View> {
        let target = self.active.as_ref()?;
        if !matches!(self.resolver.state(&target.module), ModuleState::Failed(_)) {
            return None;
        }
        let state = self.resolver.retry(&target.module);
        Some(view_for(&target.path, &target.module, &target.params, state))
    }

    /// `navigate`, then wait for the target to settle if it is pending.
    pub async fn navigate_settled(&mut self, requested: &str) -> View {
        let view = self.navigate(requested);
        if !matches!(view, View::Pending { .. }) {
            return view;
        }
        match self.pending() {
            Some(pending) => pending.settle().await,
            // Settled between the two calls.
            None => self.current_view().unwrap_or(view),
        }
    }

    fn observe(&mut self) -> Option<Session> {
        let snapshot = self.session.snapshot();
        let next = SessionPhase::of(snapshot.as_ref());
        if next != self.phase {
            tracing::info!(from = self.phase.label(), to = next.label(), role = ?next.role(), "session phase changed");
            if next.role() != self.phase.role() {
                self.landing_issued = false;
            }
            self.phase = next;
        }
        snapshot
    }

    fn landing_due(&self, path: &str) -> Option<&'static str> {
        match self.phase {
            SessionPhase::Authenticated(role) if path == HOME_PATH && !self.landing_issued => {
                Some(landing_path(role))
            }
            _ => None,
        }
    }

    fn issue_landing(&mut self, from: String, to: &'static str) -> View {
        self.landing_issued = true;
        self.supersede();
        tracing::info!(from = %from, to, "landing redirect issued");
        View::Redirect {
            from,
            to: to.to_string(),
            reason: RedirectReason::Landing,
        }
    }

    fn unmatched(&mut self, path: String, partition: &RoutePartition, session: Option<&Session>) -> View {
        let entitled = match partition.required_roles() {
            None => true,
            Some(required) => session
                .and_then(Session::effective_role)
                .is_some_and(|role| required.contains(&role)),
        };
        let reason = if entitled {
            RedirectReason::NotFound
        } else {
            RedirectReason::Unauthorized
        };
        tracing::info!(path = %path, ?reason, "no route matched");
        self.supersede();
        View::Redirect {
            from: path,
            to: HOME_PATH.to_string(),
            reason,
        }
    }

    fn activate(&mut self, path: String, module: ModuleRef, params: BTreeMap<String, String>) -> View {
        let generation = self.bump_generation();
        let state = self.resolver.resolve(&module);
        let view = view_for(&path, &module, &params, state);
        self.location = path.clone();
        self.active = Some(ActiveTarget {
            path,
            module,
            params,
            generation,
        });
        view
    }

    // Any newly determined target invalidates outstanding placeholders.
    fn supersede(&mut self) {
        self.bump_generation();
        self.active = None;
    }

    // Wakes every outstanding `PendingView::settle`.
    fn bump_generation(&self) -> u64 {
        self.generation.send_modify(|generation| *generation += 1);
        *self.generation.borrow()
    }
}

/// PendingView
///
/// Detached wait on a target that was still resolving when it was navigated to.
/// Settles to `View::Superseded` as soon as the dispatcher determines a newer target,
/// even if the abandoned resolution never finishes. The resolution itself keeps
/// running and stays cached.
#[derive(Clone)]
pub struct PendingView {
    path: String,
    module: ModuleRef,
    params: BTreeMap<String, String>,
    expected: u64,
    generation: Arc<watch::Sender<u64>>,
    resolver: Arc<ModuleResolver>,
}

impl PendingView {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    pub fn is_current(&self) -> bool {
        *self.generation.borrow() == self.expected
    }

    pub async fn settle(self) -> View {
        let mut generation = self.generation.subscribe();
        let outcome = {
            let resolution = self.resolver.resolved(&self.module);
            let moved_on = async {
                // The sender lives in `self`, so this only returns once the value moves.
                let _ = generation.wait_for(|current| *current != self.expected).await;
            };
            tokio::select! {
                outcome = resolution => Some(outcome),
                _ = moved_on => None,
            }
        };
        let Some(outcome) = outcome.filter(|_| self.is_current()) else {
            tracing::debug!(path = %self.path, module = %self.module, "pending view superseded");
            return View::Superseded { path: self.path };
        };
        let state = match outcome {
            Ok(implementation) => ModuleState::Resolved(implementation),
            Err(error) => ModuleState::Failed(error),
        };
        view_for(&self.path, &self.module, &self.params, state)
    }
}
