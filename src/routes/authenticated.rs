use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Routes open to any role, as long as the caller presents a valid token. Handlers
/// receive the caller through the `AuthUser` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // PUT /api/auth/update-password
        // Requires the current password.
        .route(
            "/api/auth/update-password",
            put(handlers::auth::update_password),
        )
        // GET /api/auth/profile
        .route("/api/auth/profile", get(handlers::auth::profile))
        // GET /api/ratings/user/{storeId}
        // The caller's own rating for a store, null when unrated.
        .route(
            "/api/ratings/user/{storeId}",
            get(handlers::ratings::user_rating),
        )
}
