use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    models::{
        DashboardStats, NewStore, NewUser, Rating, RatingWithRater, Store, StorePatch, StoreView,
        User, UserProfile,
    },
    query::{Sort, StoreFilter, StoreSortField, UserFilter, UserSortField},
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures surfaced by a persistence backend. Unique-constraint violations are split
/// out so callers can answer with a conflict rather than a server error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract for users, stores and ratings. Every rating aggregate
/// (per-store mean, per-owner mean, the caller's own rating) is computed by the
/// implementation in a single query, never by loading ratings into the caller and
/// reducing them there.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: i32) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Fails with `UniqueViolation` if the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Returns false when the user does not exist.
    async fn update_password(&self, id: i32, password_hash: &str) -> RepoResult<bool>;
    async fn list_users(
        &self,
        filter: &UserFilter,
        sort: Sort<UserSortField>,
    ) -> RepoResult<Vec<UserProfile>>;

    // --- Aggregates ---
    /// Mean rating per owner over the union of all their stores' ratings, for every id
    /// in `owner_ids`, in one round trip. Owners with no stores or no ratings map to 0.
    async fn owner_averages(&self, owner_ids: &[i32]) -> RepoResult<HashMap<i32, Decimal>>;
    async fn owner_average(&self, owner_id: i32) -> RepoResult<Decimal>;
    /// Mean rating of one store; 0 when it has no ratings.
    async fn store_average(&self, store_id: i32) -> RepoResult<Decimal>;
    async fn user_rating(&self, user_id: i32, store_id: i32) -> RepoResult<Option<i32>>;
    async fn counts(&self) -> RepoResult<DashboardStats>;

    // --- Stores ---
    async fn find_store(&self, id: i32) -> RepoResult<Option<Store>>;
    /// The caller's first store (lowest id), if any.
    async fn store_for_owner(&self, owner_id: i32) -> RepoResult<Option<Store>>;
    async fn create_store(&self, store: NewStore) -> RepoResult<Store>;
    /// Creates a Store Owner account and a store it owns as one atomic unit.
    async fn create_store_with_owner(
        &self,
        owner: NewUser,
        store: NewStore,
    ) -> RepoResult<(User, Store)>;
    async fn update_store(&self, id: i32, patch: StorePatch) -> RepoResult<Option<Store>>;
    /// Deletes the store and its ratings. Returns false when it did not exist.
    async fn delete_store(&self, id: i32) -> RepoResult<bool>;
    /// Store listing joined with owner and aggregates. When `caller` is set each row also
    /// carries that caller's own rating.
    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: Sort<StoreSortField>,
        caller: Option<i32>,
    ) -> RepoResult<Vec<StoreView>>;
    async fn store_view(&self, id: i32, caller: Option<i32>) -> RepoResult<Option<StoreView>>;

    // --- Ratings ---
    /// Insert-or-overwrite keyed by (user_id, store_id). Atomic: concurrent double
    /// submissions never produce two rows.
    async fn upsert_rating(&self, user_id: i32, store_id: i32, value: i32) -> RepoResult<Rating>;
    async fn store_ratings(&self, store_id: i32) -> RepoResult<Vec<RatingWithRater>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
