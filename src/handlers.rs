use crate::{
    AppState,
    models::{ClientCreated, NavigateRequest, RoutesResponse, SessionResponse, ViewResponse},
    session::Session,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Client Lifecycle ---

/// create_client
///
/// Registers a new navigation client. It starts in the bootstrap phase (no session read
/// yet), which dispatches like an anonymous visitor but never issues a landing redirect.
#[utoipa::path(
    post,
    path = "/clients",
    responses((status = 201, description = "Client created", body = ClientCreated))
)]
pub async fn create_client(State(state): State<AppState>) -> (StatusCode, Json<ClientCreated>) {
    let client_id = state.clients.create().await;
    (StatusCode::CREATED, Json(ClientCreated { client_id }))
}

/// delete_client
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn delete_client(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.clients.remove(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Session Ingress ---

/// put_session
///
/// Ingress for the external identity store. The payload is trusted as-is: no credential
/// is checked here. If the client is sitting on the generic root when it becomes
/// authenticated, the response carries the one-time landing redirect.
#[utoipa::path(
    put,
    path = "/clients/{id}/session",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = Session,
    responses(
        (status = 200, description = "Session applied", body = SessionResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn put_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(session): Json<Session>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let update = state
        .clients
        .publish_session(id, session)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SessionResponse::new(update.phase, update.view)))
}

/// delete_session
///
/// Logout. Protected routes are denied from the next navigation on; the view already
/// rendered is left alone.
#[utoipa::path(
    delete,
    path = "/clients/{id}/session",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Logged out", body = SessionResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let update = state
        .clients
        .logout(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SessionResponse::new(update.phase, update.view)))
}

// --- Navigation ---

/// navigate
///
/// Dispatches a navigation event. Without `wait`, an unresolved target answers
/// immediately with the `pending` placeholder. With `wait`, the handler awaits the
/// resolution after releasing the registry, so other clients are never blocked.
#[utoipa::path(
    post,
    path = "/clients/{id}/navigate",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Resulting view", body = ViewResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let (view, pending) = state
        .clients
        .navigate(id, &payload.path)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let view = match pending {
        Some(pending) if payload.wait => pending.settle().await,
        _ => view,
    };
    Ok(Json(view.into()))
}

/// current_view
///
/// Re-reads the active target's resolution state. `null` when nothing has been
/// rendered yet or the last event was a redirect.
#[utoipa::path(
    get,
    path = "/clients/{id}/view",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Current view", body = ViewResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn current_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<ViewResponse>>, StatusCode> {
    let view = state
        .clients
        .current_view(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(view.map(ViewResponse::from)))
}

/// retry
///
/// Explicit recovery from the error view. Returns 409 when the active target has not
/// failed.
#[utoipa::path(
    post,
    path = "/clients/{id}/retry",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Retry started", body = ViewResponse),
        (status = 404, description = "Unknown client"),
        (status = 409, description = "Nothing to retry")
    )
)]
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let view = state
        .clients
        .retry(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?
        .ok_or(StatusCode::CONFLICT)?;
    Ok(Json(view.into()))
}

/// get_routes
///
/// Lists the route templates the client can currently reach.
#[utoipa::path(
    get,
    path = "/clients/{id}/routes",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Reachable routes", body = RoutesResponse),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn get_routes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoutesResponse>, StatusCode> {
    let (phase, paths) = state
        .clients
        .reachable_paths(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(RoutesResponse {
        phase: phase.label().to_string(),
        role: phase.role(),
        paths,
    }))
}
