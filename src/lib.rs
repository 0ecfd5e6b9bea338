use axum::{
    Router,
    extract::FromRef,
    handler::HandlerWithoutStateExt,
    http::HeaderName,
};
use tower_sessions::SessionStore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod seed;
pub mod session;

// One router per resource, mounted under `/api`.
pub mod routes;

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, Repository, RepositoryState};
pub use session::SESSION_COOKIE;

/// ApiDoc
///
/// OpenAPI document for every `/api` endpoint, served at `/api-docs/openapi.json`
/// and browsable through Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::register, handlers::login, handlers::logout,
        handlers::me, handlers::list_events, handlers::create_event, handlers::delete_event,
        handlers::list_volunteers, handlers::update_my_profile,
        handlers::list_my_applications, handlers::apply, handlers::seed
    ),
    components(
        schemas(
            error::ErrorBody, models::Role, models::User, models::VolunteerProfile,
            models::ProfilePatch, models::Event, models::EventSummary, models::LooseInt,
            models::CreateEventRequest, models::Application, models::ApplyRequest,
            models::RegisterRequest, models::LoginRequest, models::StatusResponse,
        )
    ),
    tags(
        (name = "account", description = "Registration and sessions"),
        (name = "events", description = "Event catalogue"),
        (name = "volunteers", description = "Volunteer profiles"),
        (name = "applications", description = "Event applications")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the persistence backend and the startup configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

// The identity extractors only need the repository, not the whole state.
impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// not_found
///
/// Final fallback once neither a route nor a static file matched.
async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// create_router
///
/// Mounts the JSON API under `/api`, the API docs, and the front-end bundle as
/// the fallback, then wraps everything in the session and observability layers.
/// `session_store` is Postgres in production; tests pass a `MemoryStore`.
pub fn create_router<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Server-side sessions; the cookie only holds the session id.
    let sessions = session::session_layer(session_store, state.config.env);

    // `index.html` is served for directories; anything else missing is a JSON 404.
    let static_files = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", routes::api_routes())
        .fallback_service(static_files)
        .with_state(state)
        .layer(sessions);

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
/// Opens the `http_request` span for `TraceLayer`, tagged with the request id
/// so every log line of one request can be correlated.
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
