//! Service Layer
//!
//! Business operations sitting between the HTTP handlers and the `Repository` trait.
//! Each function takes the repository as `&dyn Repository`, so the same code runs against
//! Postgres in production and the in-memory backend in tests.

/// Signup, login, password changes, admin-created accounts and the bootstrap admin.
pub mod accounts;

/// Filtered, sorted listings of users and stores enriched with rating aggregates.
pub mod directory;

/// Rating submission (upsert) and the per-store / per-owner aggregates.
pub mod ratings;

/// Store creation, ownership validation, updates and the owner dashboard.
pub mod stores;

use crate::error::ApiError;

/// Runs a CPU-heavy closure (bcrypt) off the async executor.
pub(crate) async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))
}
