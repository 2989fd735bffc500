use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{AverageResponse, RatingSavedResponse, SubmitRatingRequest, UserRatingResponse},
    services::ratings,
    validation::{StoreId, ValidatedJson},
};

/// submit_rating
///
/// [Normal User Route] Rates a store 1-5. Submitting again for the same store overwrites
/// the earlier value.
#[utoipa::path(
    post,
    path = "/api/ratings",
    request_body = SubmitRatingRequest,
    responses(
        (status = 201, description = "Rating saved", body = RatingSavedResponse),
        (status = 400, description = "Rating out of range"),
        (status = 404, description = "Store not found")
    )
)]
pub async fn submit_rating(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<RatingSavedResponse>), ApiError> {
    let rating =
        ratings::submit_rating(state.repo.as_ref(), user.id, payload.store_id, payload.rating)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(RatingSavedResponse {
            message: "Rating saved".to_string(),
            rating: rating.rating,
        }),
    ))
}

/// user_rating
///
/// [Authenticated Route] The caller's own rating for a store, or `null`.
#[utoipa::path(
    get,
    path = "/api/ratings/user/{storeId}",
    params(("storeId" = i32, Path, description = "Store ID")),
    responses((status = 200, description = "Own rating", body = UserRatingResponse))
)]
pub async fn user_rating(
    user: AuthUser,
    State(state): State<AppState>,
    StoreId(store_id): StoreId,
) -> Result<Json<UserRatingResponse>, ApiError> {
    let rating = ratings::rating_by_user_for_store(state.repo.as_ref(), user.id, store_id).await?;
    Ok(Json(UserRatingResponse { rating }))
}

#[utoipa::path(
    get,
    path = "/api/ratings/average/{storeId}",
    params(("storeId" = i32, Path, description = "Store ID")),
    responses((status = 200, description = "Average rating", body = AverageResponse))
)]
pub async fn average(
    State(state): State<AppState>,
    StoreId(store_id): StoreId,
) -> Result<Json<AverageResponse>, ApiError> {
    let average = ratings::average_for_store(state.repo.as_ref(), store_id).await?;
    Ok(Json(AverageResponse { average }))
}
