use axum::{Router, extract::FromRef, http::HeaderName, middleware};
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

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;
pub mod validation;

// Routers grouped by the role set allowed to call them.
pub mod routes;
use auth::{AdminOnly, AnyRole, NormalUserOnly, OwnerOrAdmin, StoreOwnerOnly, TokenService};
use routes::{admin, authenticated, normal_user, public, store_owner};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup, handlers::auth::login, handlers::auth::update_password,
        handlers::auth::profile, handlers::admin::dashboard, handlers::admin::list_users,
        handlers::admin::get_user, handlers::admin::create_user, handlers::admin::list_stores,
        handlers::stores::list_stores, handlers::stores::get_store, handlers::stores::create_store,
        handlers::stores::update_store, handlers::stores::delete_store,
        handlers::ratings::submit_rating, handlers::ratings::user_rating,
        handlers::ratings::average, handlers::store_owner::my_store,
        handlers::store_owner::dashboard
    ),
    components(
        schemas(
            models::Role, models::Store, models::Rating, models::UserProfile, models::UserRef,
            models::UserListEntry, models::UserDetail, models::StoreView,
            models::RatingWithRater, models::DashboardStats, models::StoreDashboard,
            models::SignupRequest, models::LoginRequest, models::UpdatePasswordRequest,
            models::CreateUserRequest, models::NewOwnerRequest, models::CreateStoreRequest,
            models::UpdateStoreRequest, models::SubmitRatingRequest, models::MessageResponse,
            models::SignupResponse, models::TokenResponse, models::RatingSavedResponse,
            models::UserRatingResponse, models::AverageResponse, error::FieldError,
        )
    ),
    tags(
        (name = "store-ratings", description = "Store Rating Platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every request: persistence, the token
/// service and the loaded configuration. Cloning is cheap (an `Arc` and key material).
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory for tests and local runs.
    pub repo: RepositoryState,
    /// Token issuing and verification, keyed by the configured secret.
    pub tokens: TokenService,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

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

/// create_router
///
/// Assembles the routing structure, attaches one role gate per route group, registers
/// the state and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No gate. Store reads resolve identity optionally.
        .merge(public::public_routes())
        // Any valid token.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require::<AnyRole>,
            )),
        )
        // Rating submission: Normal Users only.
        .merge(
            normal_user::normal_user_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require::<NormalUserOnly>,
            )),
        )
        // Store writes share paths with the public reads; the gate applies per method.
        .merge(
            admin::store_management_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require::<AdminOnly>,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require::<AdminOnly>,
            )),
        )
        .nest(
            "/api/store-owner",
            store_owner::owner_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::require::<StoreOwnerOnly>,
                ))
                .merge(store_owner::dashboard_routes().route_layer(
                    middleware::from_fn_with_state(state.clone(), auth::require::<OwnerOrAdmin>),
                )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `http_request` span used by `TraceLayer`, correlating every log line of a
/// request through its `x-request-id`.
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
