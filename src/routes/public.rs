use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. The store reads still look at the
/// `Authorization` header, but only to enrich the response with the caller's own rating;
/// a missing or bad token never rejects the request.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/signup
        // Self-registration; always creates a Normal User.
        .route("/api/auth/signup", post(handlers::auth::signup))
        // POST /api/auth/login
        // Email + password in, bearer token out.
        .route("/api/auth/login", post(handlers::auth::login))
        // GET /api/stores?name=&address=&orderBy=&order=
        // Store listing with averageRating (and userRating when identified).
        .route("/api/stores", get(handlers::stores::list_stores))
        // GET /api/stores/{id}
        .route("/api/stores/{id}", get(handlers::stores::get_store))
        // GET /api/ratings/average/{storeId}
        // Mean rating of a store, 0 when unrated.
        .route(
            "/api/ratings/average/{storeId}",
            get(handlers::ratings::average),
        )
}
