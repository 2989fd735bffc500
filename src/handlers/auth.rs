use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        LoginRequest, MessageResponse, SignupRequest, SignupResponse, TokenResponse,
        UpdatePasswordRequest, UserProfile,
    },
    services::accounts,
    validation::ValidatedJson,
};

/// signup
///
/// [Public Route] Self-service registration. Always creates a Normal User.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = SignupResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let user = accounts::signup(state.repo.as_ref(), state.config.bcrypt_cost, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".to_string(),
            user_id: user.id,
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = accounts::login(state.repo.as_ref(), &state.tokens, payload).await?;
    Ok(Json(TokenResponse { token }))
}

/// update_password
///
/// [Authenticated Route] Changes the caller's password after checking the current one.
#[utoipa::path(
    put,
    path = "/api/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 401, description = "Invalid current password")
    )
)]
pub async fn update_password(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::update_password(
        state.repo.as_ref(),
        state.config.bcrypt_cost,
        user.id,
        payload,
    )
    .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(accounts::profile(state.repo.as_ref(), user.id).await?))
}
