use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
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

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod storage;

// Routing segregated by access level (Public, Authenticated, Admin pages).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::SessionGuard;
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for the session endpoints and the content schemas, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::session_info, handlers::upload_image
    ),
    components(
        schemas(
            models::Article, models::Banner, models::Committee, models::Content,
            models::News, models::Video, models::Gallery, models::Contact,
            models::LoginRequest, models::LoginResponse, models::LogoutResponse,
            models::SessionInfo, error::ErrorBody,
        )
    ),
    tags(
        (name = "madrasah-cms", description = "Institution website content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request needs, built once in `main` and passed into the router. There is no
/// other shared state: sessions are stateless and every request re-verifies its token.
#[derive(Clone)]
pub struct AppState {
    /// Document store holding every content collection.
    pub repo: RepositoryState,
    /// Object storage for uploaded images.
    pub storage: StorageState,
    pub config: AppConfig,
    /// Issues and verifies admin sessions.
    pub sessions: SessionGuard,
}

impl AppState {
    /// Assembles the state, deriving the session guard from the configuration.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let sessions = SessionGuard::from_config(&config);
        Self {
            repo,
            storage,
            config,
            sessions,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionGuard {
    fn from_ref(app_state: &AppState) -> SessionGuard {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routing table, attaches the session guard to the protected routes and the
/// admin page filter in front of everything, then adds the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Protected Routes: every write goes through the one session check.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_session,
            )),
        )
        .merge(admin::admin_routes(&state.config.admin_dir))
        // Admin pages: redirect to the login page before anything renders.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_page_filter,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
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
/// Span for `TraceLayer` carrying the method, URI and `x-request-id`, so every log line of a
/// request can be correlated.
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
