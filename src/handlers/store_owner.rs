use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{StoreDashboard, StoreView},
    services::stores,
    validation::StoreId,
};

/// my_store
///
/// [Store Owner Route] The caller's store with its average rating.
#[utoipa::path(
    get,
    path = "/api/store-owner/my-store",
    responses(
        (status = 200, description = "Own store", body = StoreView),
        (status = 404, description = "Owner has no store")
    )
)]
pub async fn my_store(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StoreView>, ApiError> {
    Ok(Json(stores::my_store(state.repo.as_ref(), user.id).await?))
}

/// dashboard
///
/// [Store Owner / Admin Route] All ratings of a store with their raters, plus the
/// average. Owners are limited to their own store.
#[utoipa::path(
    get,
    path = "/api/store-owner/dashboard/{storeId}",
    params(("storeId" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Ratings and average", body = StoreDashboard),
        (status = 403, description = "Not the owner of this store"),
        (status = 404, description = "Store not found")
    )
)]
pub async fn dashboard(
    user: AuthUser,
    State(state): State<AppState>,
    StoreId(store_id): StoreId,
) -> Result<Json<StoreDashboard>, ApiError> {
    Ok(Json(
        stores::owner_dashboard(state.repo.as_ref(), user, store_id).await?,
    ))
}
