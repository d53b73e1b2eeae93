use thiserror::Error;

/// ResolveError
///
/// Terminal outcome of a failed module resolution. Stored inside the memoized
/// `ModuleState::Failed`, so every caller waiting on the same ref receives a clone
/// of the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no route implementation is registered under '{0}'")]
    UnknownModule(String),

    #[error("route implementation '{module}' failed to load: {reason}")]
    LoadFailed { module: String, reason: String },

    #[error("loader panicked while fetching '{0}'")]
    Panicked(String),

    #[error("resolution of '{0}' was abandoned before it settled")]
    Abandoned(String),

    #[error("no async runtime available to fetch '{0}'")]
    NoRuntime(String),
}

/// RouteTreeError
///
/// Structural violations detected while assembling a `RouteTable`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTreeError {
    #[error("more than one index route under '{0}'")]
    DuplicateIndex(String),

    #[error("mount path '{0}' is registered twice")]
    DuplicateMount(String),

    #[error("restricted partition at '{0}' has no required roles")]
    EmptyRoleSet(String),

    #[error("expected exactly one public partition, found {0}")]
    PublicPartitionCount(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);
