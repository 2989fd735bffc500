use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Normal User Router Module
///
/// Only Normal Users submit ratings; owners and administrators are rejected with 403.
pub fn normal_user_routes() -> Router<AppState> {
    Router::new()
        // POST /api/ratings
        // Upsert keyed by (user, store).
        .route("/api/ratings", post(handlers::ratings::submit_rating))
}
