use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// The navigation authorization core.
pub mod roles;
pub mod session;
pub mod routes;
pub mod modules;
pub mod guard;
pub mod landing;
pub mod dispatcher;
pub mod error;

// HTTP adapter around the core.
pub mod clients;
pub mod config;
pub mod handlers;
pub mod models;

// --- Public Re-exports ---

pub use clients::ClientRegistry;
pub use config::AppConfig;
pub use dispatcher::{ComposedRoutes, Dispatcher, PendingView, RedirectReason, View};
pub use guard::{AccessDecision, DenyReason, Guard, PublicGuard, RoleGuard, decide};
pub use landing::landing_path;
pub use modules::{
    CatalogLoader, LoaderState, MockModuleLoader, ModuleLoader, ModuleRef, ModuleResolver,
    ModuleState, RouteModule,
};
pub use roles::Role;
pub use routes::{HOME_PATH, RouteNode, RoutePartition, RouteTable};
pub use session::{Session, SessionPhase, SessionReader, SessionWriter, session_channel};

/// ApiDoc
///
/// OpenAPI description of the navigation endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_client, handlers::delete_client, handlers::put_session,
        handlers::delete_session, handlers::navigate, handlers::current_view,
        handlers::retry, handlers::get_routes
    ),
    components(
        schemas(
            models::NavigateRequest, models::ClientCreated, models::ViewResponse,
            models::RedirectKind, models::SessionResponse, models::RoutesResponse,
            session::Session, roles::Role,
        )
    ),
    tags(
        (name = "marketplace-nav", description = "Role-based navigation authorization API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared state handed to every handler: the client directory (which owns the route
/// table and module resolver) and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub clients: ClientRegistry,
    pub config: AppConfig,
}

impl AppState {
    /// Builds state over the built-in route table, serving implementations from the
    /// table's own catalogue.
    pub fn new(config: AppConfig) -> Self {
        let table = RouteTable::builtin();
        let loader = Arc::new(CatalogLoader::for_table(table, config.module_load_delay)) as LoaderState;
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: AppConfig, loader: LoaderState) -> Self {
        let resolver = Arc::new(ModuleResolver::new(loader));
        Self {
            clients: ClientRegistry::new(RouteTable::builtin(), resolver),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ClientRegistry {
    fn from_ref(app_state: &AppState) -> ClientRegistry {
        app_state.clients.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the HTTP surface, applies the observability layers and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Client lifecycle ---
        .route("/clients", post(handlers::create_client))
        .route("/clients/{id}", delete(handlers::delete_client))
        // --- Session ingress (identity store side) ---
        .route(
            "/clients/{id}/session",
            put(handlers::put_session).delete(handlers::delete_session),
        )
        // --- Navigation ---
        .route("/clients/{id}/navigate", post(handlers::navigate))
        .route("/clients/{id}/view", get(handlers::current_view))
        .route("/clients/{id}/retry", post(handlers::retry))
        .route("/clients/{id}/routes", get(handlers::get_routes))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: every log line of one request carries its method,
/// URI and request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
