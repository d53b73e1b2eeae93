use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{runtime::Handle, sync::watch};

use crate::{error::ResolveError, routes::RouteTable};

/// ModuleRef
///
/// Opaque handle naming a route implementation that has not necessarily been loaded.
/// Route trees only ever hold these; nothing is fetched while the tree is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRef(Cow<'static, str>);

impl ModuleRef {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RouteModule
///
/// A resolved, renderable route implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteModule {
    pub id: ModuleRef,
    /// Name of the component the client mounts for this route.
    pub component: String,
    pub loaded_at: DateTime<Utc>,
}

/// ModuleState
///
/// `Unresolved -> Resolving -> Resolved | Failed`. `Failed` only leaves through an
/// explicit `ModuleResolver::retry`.
#[derive(Debug, Clone)]
pub enum ModuleState {
    Unresolved,
    Resolving,
    Resolved(Arc<RouteModule>),
    Failed(ResolveError),
}

impl ModuleState {
    pub fn is_settled(&self) -> bool {
        matches!(self, ModuleState::Resolved(_) | ModuleState::Failed(_))
    }
}

// 1. ModuleLoader Contract
/// ModuleLoader
///
/// Fetches the code behind a single `ModuleRef`. The resolver guarantees at most one
/// in-flight `load` per ref, so implementations need no deduplication of their own.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, module: &ModuleRef) -> Result<RouteModule, ResolveError>;
}

/// LoaderState
///
/// Shared handle to whichever loader backs the resolver.
pub type LoaderState = Arc<dyn ModuleLoader>;

type Slot = Arc<watch::Sender<ModuleState>>;

// 2. The Resolver
/// ModuleResolver
///
/// Single-flight, memoizing front of a `ModuleLoader`. Each ref owns one `watch`
/// slot; the `Unresolved -> Resolving` transition happens inside `send_if_modified`,
/// so concurrent callers race on the slot rather than on the loader.
///
/// `resolve` and `retry` spawn onto the ambient tokio runtime. Called without one,
/// the ref settles as `Failed(ResolveError::NoRuntime)` instead of panicking.
pub struct ModuleResolver {
    loader: LoaderState,
    slots: Mutex<HashMap<ModuleRef, Slot>>,
}

impl ModuleResolver {
    pub fn new(loader: LoaderState) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, module: &ModuleRef) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(module.clone())
            .or_insert_with(|| Arc::new(watch::channel(ModuleState::Unresolved).0))
            .clone()
    }

    /// Current state without triggering a fetch.
    pub fn state(&self, module: &ModuleRef) -> ModuleState {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(module)
            .map(|slot| slot.borrow().clone())
            .unwrap_or(ModuleState::Unresolved)
    }

    /// Non-blocking. Starts the fetch on first use and reports where the ref stands.
    pub fn resolve(&self, module: &ModuleRef) -> ModuleState {
        let slot = self.slot(module);
        let started = slot.send_if_modified(|state| match state {
            ModuleState::Unresolved => {
                *state = ModuleState::Resolving;
                true
            }
            _ => false,
        });
        if started {
            self.spawn_load(module.clone(), Arc::clone(&slot));
        }
        let current = slot.borrow().clone();
        current
    }

    /// Explicit recovery for a `Failed` ref. Any other state is returned untouched.
    pub fn retry(&self, module: &ModuleRef) -> ModuleState {
        let slot = self.slot(module);
        let restarted = slot.send_if_modified(|state| match state {
            ModuleState::Failed(_) => {
                *state = ModuleState::Resolving;
                true
            }
            _ => false,
        });
        if restarted {
            tracing::info!(module = %module, "retrying route implementation");
            self.spawn_load(module.clone(), Arc::clone(&slot));
        }
        let current = slot.borrow().clone();
        current
    }

    /// Starts resolution if needed and waits for it to settle.
    pub async fn resolved(&self, module: &ModuleRef) -> Result<Arc<RouteModule>, ResolveError> {
        self.resolve(module);
        let mut rx = self.subscribe(module);
        let settled = rx
            .wait_for(ModuleState::is_settled)
            .await
            .map_err(|_| ResolveError::Abandoned(module.to_string()))?;
        match &*settled {
            ModuleState::Resolved(implementation) => Ok(Arc::clone(implementation)),
            ModuleState::Failed(error) => Err(error.clone()),
            ModuleState::Unresolved | ModuleState::Resolving => {
                Err(ResolveError::Abandoned(module.to_string()))
            }
        }
    }

    pub fn subscribe(&self, module: &ModuleRef) -> watch::Receiver<ModuleState> {
        self.slot(module).subscribe()
    }

    // Outside a tokio runtime there is nothing to fetch on: the ref settles as failed
    // and can be retried once a runtime is available.
    fn spawn_load(&self, module: ModuleRef, slot: Slot) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(module = %module, "no tokio runtime to fetch route implementation on");
            slot.send_replace(ModuleState::Failed(ResolveError::NoRuntime(module.to_string())));
            return;
        };
        let loader = Arc::clone(&self.loader);
        runtime.spawn(async move {
            let target = module.clone();
            // The inner task isolates loader panics so the slot always settles.
            let fetched = tokio::spawn(async move { loader.load(&target).await }).await;
            let next = match fetched {
                Ok(Ok(implementation)) => {
                    tracing::debug!(module = %module, component = %implementation.component, "route implementation resolved");
                    ModuleState::Resolved(Arc::new(implementation))
                }
                Ok(Err(error)) => {
                    tracing::warn!(module = %module, error = %error, "route implementation failed to resolve");
                    ModuleState::Failed(error)
                }
                Err(join_error) => {
                    tracing::error!(module = %module, error = %join_error, "route implementation loader panicked");
                    ModuleState::Failed(ResolveError::Panicked(module.to_string()))
                }
            };
            slot.send_replace(next);
        });
    }
}

/// component_name
///
/// Derives a component identifier from a module ref, e.g. `seller/product-edit`
/// becomes `SellerProductEdit`.
fn component_name(module: &ModuleRef) -> String {
    module
        .as_str()
        .split(|c: char| c == '/' || c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// 3. The Real Implementation
/// CatalogLoader
///
/// Serves every implementation referenced by a route table. `delay` stands in for the
/// time a real code fetch takes.
#[derive(Clone)]
pub struct CatalogLoader {
    catalog: HashSet<ModuleRef>,
    delay: Duration,
}

impl CatalogLoader {
    pub fn new(modules: impl IntoIterator<Item = ModuleRef>, delay: Duration) -> Self {
        Self {
            catalog: modules.into_iter().collect(),
            delay,
        }
    }

    pub fn for_table(table: &RouteTable, delay: Duration) -> Self {
        Self::new(table.module_refs(), delay)
    }
}

#[async_trait]
impl ModuleLoader for CatalogLoader {
    async fn load(&self, module: &ModuleRef) -> Result<RouteModule, ResolveError> {
        if !self.catalog.contains(module) {
            return Err(ResolveError::UnknownModule(module.to_string()));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(RouteModule {
            id: module.clone(),
            component: component_name(module),
            loaded_at: Utc::now(),
        })
    }
}

// 4. The Mock Implementation (For Tests)
/// MockModuleLoader
///
/// Counts loads, fails selected refs on demand, and can hold every load at a gate so
/// tests can observe the `Resolving` state deterministically.
#[derive(Clone)]
pub struct MockModuleLoader {
    calls: Arc<AtomicUsize>,
    failing: Arc<Mutex<HashSet<ModuleRef>>>,
    panicking: Arc<Mutex<HashSet<ModuleRef>>>,
    gate: Arc<watch::Sender<bool>>,
}

impl MockModuleLoader {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(Mutex::new(HashSet::new())),
            panicking: Arc::new(Mutex::new(HashSet::new())),
            gate: Arc::new(watch::channel(true).0),
        }
    }

    /// A loader whose loads stay pending until `open_gate` is called.
    pub fn gated() -> Self {
        let loader = Self::new();
        loader.gate.send_replace(false);
        loader
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail(&self, module: &ModuleRef) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.clone());
    }

    pub fn heal(&self, module: &ModuleRef) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module);
    }

    pub fn panic_on(&self, module: &ModuleRef) {
        self.panicking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.clone());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleLoader for MockModuleLoader {
    async fn load(&self, module: &ModuleRef) -> Result<RouteModule, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let should_panic = self
            .panicking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(module);
        if should_panic {
            panic!("Mock Loader Panic: Simulation requested for {module}");
        }

        let should_fail = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(module);
        if should_fail {
            return Err(ResolveError::LoadFailed {
                module: module.to_string(),
                reason: "Mock Loader Error: Simulation requested".to_string(),
            });
        }

        Ok(RouteModule {
            id: module.clone(),
            component: component_name(module),
            loaded_at: Utc::now(),
        })
    }
}
