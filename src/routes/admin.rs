use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Everything under `/api/admin`, mounted with `nest`. Paths here are relative to that
/// prefix.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/dashboard
        // Total users, stores and ratings.
        .route("/dashboard", get(handlers::admin::dashboard))
        // GET/POST /api/admin/users
        // Filtered, sorted user directory; create an account with any role.
        .route(
            "/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        // GET /api/admin/users/{id}
        // Store Owners come back with their aggregate storeRating.
        .route("/users/{id}", get(handlers::admin::get_user))
        // GET /api/admin/stores
        // Like the public listing, plus email filter/sort and never a userRating.
        .route("/stores", get(handlers::admin::list_stores))
}

/// Store management under `/api/stores`. These share paths with the public store reads,
/// so they are merged (not nested) and gated per method.
pub fn store_management_routes() -> Router<AppState> {
    Router::new()
        // POST /api/stores
        // Requires ownerId (existing Store Owner) or a complete inline owner.
        .route("/api/stores", post(handlers::stores::create_store))
        // PUT/DELETE /api/stores/{id}
        .route(
            "/api/stores/{id}",
            put(handlers::stores::update_store).delete(handlers::stores::delete_store),
        )
}
