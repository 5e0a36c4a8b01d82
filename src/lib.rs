use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;

pub mod routes;
use auth::AdminViewer;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{GateError, StoreError};
pub use gate::{AccessGate, GatePolicy};
pub use repository::{InMemoryUserStore, PostgresUserStore, UserStore, UserStoreState};
pub use session::{JwtSessionProvider, SessionProvider, SessionProviderState};

/// Where the admin-only OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/admin/api-docs/openapi.json";
/// Where the admin-only Swagger UI is served.
pub const SWAGGER_UI_PATH: &str = "/admin/swagger-ui";

/// ApiDoc
///
/// OpenAPI document for the service, served at `OPENAPI_PATH` to admins only.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_dashboard, handlers::get_api_docs),
    components(
        schemas(
            models::Role, models::ViewerProfile, models::DashboardView,
            models::ApiDocsView, models::ErrorBody,
        )
    ),
    tags(
        (name = "lms-gate", description = "LMS page access gate")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the collaborators every gate needs.
#[derive(Clone)]
pub struct AppState {
    /// Authoritative user records.
    pub store: UserStoreState,
    /// Resolves the caller's session from request headers.
    pub sessions: SessionProviderState,
    /// The loaded configuration, including redirect targets and retry policy.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for UserStoreState {
    fn from_ref(app_state: &AppState) -> UserStoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for SessionProviderState {
    fn from_ref(app_state: &AppState) -> SessionProviderState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_admin
///
/// Route-layer middleware for routes whose handlers we do not own (Swagger
/// UI). Extracting `AdminViewer` runs the admin gate; a redirect or a lookup
/// failure rejects the request before `next` is called.
pub async fn require_admin(_admin: AdminViewer, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles every route, applies the observability layers and registers the
/// application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes(state.clone()))
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
/// Span for every request, tagged with the `x-request-id` set above so all
/// gate decisions for one request correlate.
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
