use std::borrow::Cow;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::{
    error::{ApiError, FieldError},
    models::Role,
};

pub const PASSWORD_RULE: &str =
    "Password must be 8-16 chars and include at least one uppercase letter and one special character";

/// validate_password
///
/// 8 to 16 characters, at least one ASCII uppercase letter and at least one character
/// that is neither a letter nor a digit.
pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_special = value.chars().any(|c| !c.is_ascii_alphanumeric());

    if (8..=16).contains(&len) && has_upper && has_special {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_policy");
        error.message = Some(Cow::Borrowed(PASSWORD_RULE));
        Err(error)
    }
}

pub fn validate_role(value: &str) -> Result<(), ValidationError> {
    match value.parse::<Role>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut error = ValidationError::new("role");
            error.message = Some(Cow::Borrowed("Invalid role"));
            Err(error)
        }
    }
}

/// ValidatedJson
///
/// JSON body extractor that runs the payload's `Validate` rules after deserialization.
/// Malformed bodies become `InvalidArgument`; rule failures become the collected
/// `Validation` list.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidArgument(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// StoreId
///
/// Single numeric path parameter naming a store (`/api/stores/{id}`,
/// `/api/ratings/average/{storeId}`, ...). Anything that is not an integer >= 1 is
/// answered with a 400 `{ "errors": [...] }` envelope keyed by the parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreId(pub i32);

/// UserId
///
/// Same as [`StoreId`] for `/api/admin/users/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i32);

impl<S> FromRequestParts<S> for StoreId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        positive_id(parts, state, "Invalid store id").await.map(StoreId)
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        positive_id(parts, state, "Invalid user id").await.map(UserId)
    }
}

async fn positive_id<S>(parts: &mut Parts, state: &S, message: &str) -> Result<i32, ApiError>
where
    S: Send + Sync,
{
    let Path(params) = Path::<Vec<(String, String)>>::from_request_parts(parts, state)
        .await
        .map_err(|rejection| ApiError::InvalidArgument(rejection.body_text()))?;
    let Some((name, raw)) = params.into_iter().next() else {
        return Err(ApiError::InvalidArgument("Missing path parameter".to_string()));
    };

    match raw.parse::<i32>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::Validation(vec![FieldError {
            field: name,
            message: message.to_string(),
        }])),
    }
}
