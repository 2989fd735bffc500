use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::MaybeAuthUser,
    error::ApiError,
    models::{CreateStoreRequest, MessageResponse, Store, StoreView, UpdateStoreRequest},
    query::StoreQuery,
    services::{directory, stores},
    validation::{StoreId, ValidatedJson},
};

/// list_stores
///
/// [Public Route] Store listing. When the request carries a valid token each row also
/// has `userRating`; otherwise the field is omitted.
#[utoipa::path(
    get,
    path = "/api/stores",
    params(StoreQuery),
    responses((status = 200, description = "Stores", body = [StoreView]))
)]
pub async fn list_stores(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<Vec<StoreView>>, ApiError> {
    let stores = directory::list_stores(
        state.repo.as_ref(),
        &query.public_filter(),
        query.public_sort(),
        caller.id(),
    )
    .await?;
    Ok(Json(stores))
}

#[utoipa::path(
    get,
    path = "/api/stores/{id}",
    params(("id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store", body = StoreView),
        (status = 400, description = "Invalid store id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_store(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    StoreId(id): StoreId,
) -> Result<Json<StoreView>, ApiError> {
    Ok(Json(
        directory::get_store(state.repo.as_ref(), id, caller.id()).await?,
    ))
}

/// create_store
///
/// [Admin Route] Creates a store owned either by an existing Store Owner (`ownerId`) or
/// by a new owner account described inline (`owner`).
#[utoipa::path(
    post,
    path = "/api/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Created", body = Store),
        (status = 400, description = "Invalid owner or validation failure"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_store(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), ApiError> {
    let store = stores::create_store(state.repo.as_ref(), state.config.bcrypt_cost, payload).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

#[utoipa::path(
    put,
    path = "/api/stores/{id}",
    params(("id" = i32, Path, description = "Store ID")),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Updated", body = Store),
        (status = 400, description = "Invalid store id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_store(
    State(state): State<AppState>,
    StoreId(id): StoreId,
    ValidatedJson(payload): ValidatedJson<UpdateStoreRequest>,
) -> Result<Json<Store>, ApiError> {
    Ok(Json(
        stores::update_store(state.repo.as_ref(), id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/stores/{id}",
    params(("id" = i32, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Invalid store id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_store(
    State(state): State<AppState>,
    StoreId(id): StoreId,
) -> Result<Json<MessageResponse>, ApiError> {
    stores::delete_store(state.repo.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("Store deleted")))
}
