use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::ApiError,
    models::{CreateUserRequest, DashboardStats, StoreView, UserDetail, UserListEntry, UserProfile},
    query::{StoreQuery, UserQuery},
    services::{accounts, directory},
    validation::{UserId, ValidatedJson},
};

/// dashboard
///
/// [Admin Route] Platform-wide counts of users, stores and ratings.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(directory::dashboard(state.repo.as_ref()).await?))
}

/// list_users
///
/// [Admin Route] Filtered, sorted user directory. Unknown sort keys fall back to name.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserQuery),
    responses((status = 200, description = "Users", body = [UserListEntry]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserListEntry>>, ApiError> {
    let users = directory::list_users(state.repo.as_ref(), &query.filter(), query.sort()).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<Json<UserDetail>, ApiError> {
    Ok(Json(directory::get_user_detail(state.repo.as_ref(), id).await?))
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user = accounts::create_user(state.repo.as_ref(), state.config.bcrypt_cost, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// list_stores
///
/// [Admin Route] Store listing with email filter/sort on top of the public surface.
#[utoipa::path(
    get,
    path = "/api/admin/stores",
    params(StoreQuery),
    responses((status = 200, description = "Stores", body = [StoreView]))
)]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<Vec<StoreView>>, ApiError> {
    let stores = directory::list_stores(
        state.repo.as_ref(),
        &query.admin_filter(),
        query.admin_sort(),
        None,
    )
    .await?;
    Ok(Json(stores))
}
