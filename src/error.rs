use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// FieldError
///
/// One entry of the `{ "errors": [...] }` envelope returned when request validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, TS)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// ApiError
///
/// The error taxonomy shared by every operation. Each variant maps to exactly one
/// HTTP status so callers can tell the failure classes apart.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token, or a token that failed verification.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid token, but the role or ownership does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Input failed a business rule (e.g. owner reference is not a Store Owner).
    #[error("{0}")]
    InvalidArgument(String),

    /// Input failed shape/range validation. All failing fields are collected.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation (duplicate email and friends).
    #[error("{0}")]
    Conflict(String),

    /// Storage or hashing failure that is not the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidArgument(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            ApiError::Internal(detail) => {
                // The detail stays in the logs; clients get a generic message.
                tracing::error!(%detail, "request failed with an internal error");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::UniqueViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(error: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {error}"))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut collected = Vec::new();
        flatten_validation_errors(None, &errors, &mut collected);
        // HashMap iteration order is arbitrary; keep the envelope stable.
        collected.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(collected)
    }
}

/// Walks nested validation results (e.g. the inline `owner` object of a store request)
/// and emits one `FieldError` per failing rule, using dotted paths like `owner.email`.
fn flatten_validation_errors(
    prefix: Option<&str>,
    errors: &validator::ValidationErrors,
    out: &mut Vec<FieldError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{p}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    out.push(FieldError {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten_validation_errors(Some(&path), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(Some(&format!("{path}[{index}]")), inner, out);
                }
            }
        }
    }
}
