use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dispatcher::{RedirectReason, View},
    roles::Role,
    session::SessionPhase,
};

// --- Request Payloads (Input Schemas) ---

/// NavigateRequest
///
/// Input payload for a navigation event (POST /clients/{id}/navigate).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NavigateRequest {
    /// Target path as typed or linked, e.g. `/seller/products/42/edit`.
    #[schema(example = "/admin/users")]
    pub path: String,
    /// When true, the response waits for the target's implementation instead of
    /// returning the pending placeholder.
    #[serde(default)]
    pub wait: bool,
}

// --- Output Schemas ---

/// ClientCreated
///
/// Output of POST /clients. The id addresses every other client endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ClientCreated {
    pub client_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RedirectKind {
    Unauthorized,
    Landing,
    NotFound,
}

impl From<RedirectReason> for RedirectKind {
    fn from(reason: RedirectReason) -> Self {
        match reason {
            RedirectReason::Unauthorized => RedirectKind::Unauthorized,
            RedirectReason::Landing => RedirectKind::Landing,
            RedirectReason::NotFound => RedirectKind::NotFound,
        }
    }
}

/// ViewResponse
///
/// Wire form of a dispatcher `View`. The `kind` tag tells the client whether to mount
/// a component, show the pending placeholder, follow a redirect, or show the error view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ViewResponse {
    Render {
        path: String,
        module: String,
        component: String,
        params: BTreeMap<String, String>,
        loaded_at: DateTime<Utc>,
    },
    Pending {
        path: String,
        module: String,
    },
    Redirect {
        from: String,
        to: String,
        reason: RedirectKind,
    },
    Failed {
        path: String,
        module: String,
        message: String,
    },
    Superseded {
        path: String,
    },
}

impl From<View> for ViewResponse {
    fn from(view: View) -> Self {
        match view {
            View::Render {
                path,
                module,
                params,
            } => ViewResponse::Render {
                path,
                module: module.id.to_string(),
                component: module.component.clone(),
                params,
                loaded_at: module.loaded_at,
            },
            View::Pending { path, module } => ViewResponse::Pending {
                path,
                module: module.to_string(),
            },
            View::Redirect { from, to, reason } => ViewResponse::Redirect {
                from,
                to,
                reason: reason.into(),
            },
            View::Failed {
                path,
                module,
                error,
            } => ViewResponse::Failed {
                path,
                module: module.to_string(),
                message: error.to_string(),
            },
            View::Superseded { path } => ViewResponse::Superseded { path },
        }
    }
}

/// SessionResponse
///
/// Output of the session endpoints: the phase the client's dispatcher now observes,
/// plus the one-time landing redirect when the update triggered it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    /// "no_session" | "unauthenticated" | "authenticated"
    pub phase: String,
    pub role: Option<Role>,
    pub view: Option<ViewResponse>,
}

impl SessionResponse {
    pub fn new(phase: SessionPhase, view: Option<View>) -> Self {
        Self {
            phase: phase.label().to_string(),
            role: phase.role(),
            view: view.map(ViewResponse::from),
        }
    }
}

/// RoutesResponse
///
/// Paths reachable for the client's current phase (public forest plus its own role's
/// partition).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoutesResponse {
    pub phase: String,
    pub role: Option<Role>,
    pub paths: Vec<String>,
}
