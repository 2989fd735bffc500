//! Store Owner Router Module
//!
//! Mounted under `/api/store-owner`. Split in two because the routes have different role
//! sets.

use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Routes only a Store Owner may call.
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        // GET /api/store-owner/my-store
        .route("/my-store", get(handlers::store_owner::my_store))
}

/// Routes shared by Store Owners (own store only) and administrators (any store).
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /api/store-owner/dashboard/{storeId}
        .route(
            "/dashboard/{storeId}",
            get(handlers::store_owner::dashboard),
        )
}
