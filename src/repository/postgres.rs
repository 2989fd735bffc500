use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    models::{
        DashboardStats, NewStore, NewUser, Rating, RatingWithRater, Store, StorePatch, StoreView,
        User, UserProfile, UserRef,
    },
    query::{Sort, SortField, StoreFilter, StoreSortField, UserFilter, UserSortField},
};

const USER_COLUMNS: &str = "id, name, email, password_hash, address, role, created_at, updated_at";
const STORE_COLUMNS: &str = "id, name, email, address, owner_id, created_at, updated_at";
const RATING_COLUMNS: &str = "id, rating, user_id, store_id, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Dynamic filters and sorting
/// go through `QueryBuilder`; only values are bound, and ORDER BY columns come from the
/// static allow-list in `query`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// db_err
///
/// Logs a failed statement under its operation name and classifies it. Unique
/// violations are mapped to a caller-facing message based on the violated constraint.
fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let message = match db.constraint() {
                    Some("users_email_key") => "A user with this email already exists.",
                    Some("stores_email_key") => "A store with this email already exists.",
                    _ => "A record with the same unique value already exists.",
                };
                tracing::debug!(op, constraint = ?db.constraint(), "unique violation");
                return RepositoryError::UniqueViolation(message.to_string());
            }
        }
        tracing::error!("{} error: {:?}", op, e);
        RepositoryError::Database(e)
    }
}

/// Escapes LIKE metacharacters so a filter term only ever matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// StoreRow
///
/// Flat result of the store read-model query, before the owner columns are folded into
/// an optional `UserRef`.
#[derive(FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    email: String,
    address: String,
    owner_id: Option<i32>,
    owner_ref_id: Option<i32>,
    owner_name: Option<String>,
    owner_email: Option<String>,
    average_rating: Decimal,
    user_rating: Option<i32>,
}

impl StoreRow {
    fn into_view(self, caller_identified: bool) -> StoreView {
        let owner = match (self.owner_ref_id, self.owner_name, self.owner_email) {
            (Some(id), Some(name), Some(email)) => Some(UserRef { id, name, email }),
            _ => None,
        };
        StoreView {
            id: self.id,
            name: self.name,
            email: self.email,
            address: self.address,
            owner_id: self.owner_id,
            owner,
            average_rating: self.average_rating,
            user_rating: caller_identified.then_some(self.user_rating),
        }
    }
}

#[derive(FromRow)]
struct RatingRow {
    id: i32,
    rating: i32,
    user_id: i32,
    store_id: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    user_name: String,
    user_email: String,
}

impl From<RatingRow> for RatingWithRater {
    fn from(row: RatingRow) -> Self {
        RatingWithRater {
            id: row.id,
            rating: row.rating,
            user_id: row.user_id,
            store_id: row.store_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserRef {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

/// Starts the store read-model query: store columns, owner columns, the correlated
/// average, and (when a caller is known) the caller's own rating.
fn store_view_query(caller: Option<i32>) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            s.id, s.name, s.email, s.address, s.owner_id,
            o.id AS owner_ref_id, o.name AS owner_name, o.email AS owner_email,
            (SELECT COALESCE(AVG(r.rating), 0) FROM ratings r WHERE r.store_id = s.id) AS average_rating,
        "#,
    );
    match caller {
        Some(user_id) => {
            builder.push(
                "(SELECT r.rating FROM ratings r WHERE r.store_id = s.id AND r.user_id = ",
            );
            builder.push_bind(user_id);
            builder.push(") AS user_rating");
        }
        None => {
            builder.push("NULL::INTEGER AS user_rating");
        }
    }
    builder.push(" FROM stores s LEFT JOIN users o ON o.id = s.owner_id WHERE 1 = 1");
    builder
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: i32) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("find_user"))
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("find_user_by_email"))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, address, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.address)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("create_user"))
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(db_err("update_password"))?;
        Ok(result.rows_affected() > 0)
    }

    /// list_users
    ///
    /// Every filter is an escaped `ILIKE '%term%'`. Role is matched on its text label.
    async fn list_users(
        &self,
        filter: &UserFilter,
        sort: Sort<UserSortField>,
    ) -> RepoResult<Vec<UserProfile>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, name, email, address, role FROM users WHERE 1 = 1");

        if let Some(name) = &filter.name {
            builder.push(" AND name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(email) = &filter.email {
            builder.push(" AND email ILIKE ").push_bind(like_pattern(email));
        }
        if let Some(address) = &filter.address {
            builder
                .push(" AND address ILIKE ")
                .push_bind(like_pattern(address));
        }
        if let Some(role) = &filter.role {
            builder.push(" AND role::text ILIKE ").push_bind(like_pattern(role));
        }

        builder
            .push(" ORDER BY ")
            .push(sort.field.column())
            .push(" ")
            .push(sort.order.as_sql())
            .push(", id ASC");

        builder
            .build_query_as::<UserProfile>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("list_users"))
    }

    /// owner_averages
    ///
    /// One grouped query for the whole batch. LEFT JOINs keep owners without stores or
    /// ratings in the result with a 0 average.
    async fn owner_averages(&self, owner_ids: &[i32]) -> RepoResult<HashMap<i32, Decimal>> {
        if owner_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (i32, Decimal)>(
            r#"
            SELECT u.id AS owner_id, COALESCE(AVG(r.rating), 0) AS average_rating
            FROM users u
            LEFT JOIN stores s ON s.owner_id = u.id
            LEFT JOIN ratings r ON r.store_id = s.id
            WHERE u.id = ANY($1)
            GROUP BY u.id
            "#,
        )
        .bind(owner_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("owner_averages"))?;

        Ok(rows.into_iter().collect())
    }

    async fn owner_average(&self, owner_id: i32) -> RepoResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(AVG(r.rating), 0)
            FROM stores s
            JOIN ratings r ON r.store_id = s.id
            WHERE s.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("owner_average"))
    }

    async fn store_average(&self, store_id: i32) -> RepoResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(AVG(rating), 0) FROM ratings WHERE store_id = $1",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("store_average"))
    }

    async fn user_rating(&self, user_id: i32, store_id: i32) -> RepoResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            "SELECT rating FROM ratings WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("user_rating"))
    }

    /// counts
    ///
    /// Compiles the dashboard counters in a single round trip.
    async fn counts(&self) -> RepoResult<DashboardStats> {
        let (users_count, stores_count, ratings_count) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM stores),
                    (SELECT COUNT(*) FROM ratings)
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("counts"))?;

        Ok(DashboardStats {
            users_count,
            stores_count,
            ratings_count,
        })
    }

    async fn find_store(&self, id: i32) -> RepoResult<Option<Store>> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1");
        sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("find_store"))
    }

    async fn store_for_owner(&self, owner_id: i32) -> RepoResult<Option<Store>> {
        let sql =
            format!("SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1 ORDER BY id LIMIT 1");
        sqlx::query_as::<_, Store>(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("store_for_owner"))
    }

    async fn create_store(&self, store: NewStore) -> RepoResult<Store> {
        let sql = format!(
            "INSERT INTO stores (name, email, address, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING {STORE_COLUMNS}"
        );
        sqlx::query_as::<_, Store>(&sql)
            .bind(store.name)
            .bind(store.email)
            .bind(store.address)
            .bind(store.owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("create_store"))
    }

    /// create_store_with_owner
    ///
    /// Both inserts share one transaction, so a duplicate store email does not leave an
    /// orphaned owner account behind.
    async fn create_store_with_owner(
        &self,
        owner: NewUser,
        store: NewStore,
    ) -> RepoResult<(User, Store)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("create_store_with_owner"))?;

        let user_sql = format!(
            "INSERT INTO users (name, email, password_hash, address, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&user_sql)
            .bind(owner.name)
            .bind(owner.email)
            .bind(owner.password_hash)
            .bind(owner.address)
            .bind(owner.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("create_store_with_owner"))?;

        let store_sql = format!(
            "INSERT INTO stores (name, email, address, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING {STORE_COLUMNS}"
        );
        let store = sqlx::query_as::<_, Store>(&store_sql)
            .bind(store.name)
            .bind(store.email)
            .bind(store.address)
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("create_store_with_owner"))?;

        tx.commit()
            .await
            .map_err(db_err("create_store_with_owner"))?;
        Ok((user, store))
    }

    /// update_store
    ///
    /// Uses `COALESCE` so only the fields present in the patch change.
    async fn update_store(&self, id: i32, patch: StorePatch) -> RepoResult<Option<Store>> {
        let sql = format!(
            r#"
            UPDATE stores
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                address = COALESCE($4, address),
                owner_id = CASE WHEN $5 THEN $6 ELSE owner_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email)
            .bind(patch.address)
            .bind(patch.owner_id.is_some())
            .bind(patch.owner_id.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("update_store"))
    }

    async fn delete_store(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_store"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: Sort<StoreSortField>,
        caller: Option<i32>,
    ) -> RepoResult<Vec<StoreView>> {
        let mut builder = store_view_query(caller);

        if let Some(name) = &filter.name {
            builder.push(" AND s.name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(email) = &filter.email {
            builder
                .push(" AND s.email ILIKE ")
                .push_bind(like_pattern(email));
        }
        if let Some(address) = &filter.address {
            builder
                .push(" AND s.address ILIKE ")
                .push_bind(like_pattern(address));
        }

        builder
            .push(" ORDER BY ")
            .push(sort.field.column())
            .push(" ")
            .push(sort.order.as_sql())
            .push(", s.id ASC");

        let rows = builder
            .build_query_as::<StoreRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("list_stores"))?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(caller.is_some()))
            .collect())
    }

    async fn store_view(&self, id: i32, caller: Option<i32>) -> RepoResult<Option<StoreView>> {
        let mut builder = store_view_query(caller);
        builder.push(" AND s.id = ").push_bind(id);

        let row = builder
            .build_query_as::<StoreRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("store_view"))?;

        Ok(row.map(|row| row.into_view(caller.is_some())))
    }

    /// upsert_rating
    ///
    /// `ON CONFLICT` on the (user_id, store_id) unique key makes insert-or-overwrite a
    /// single atomic statement. The row id survives an overwrite.
    async fn upsert_rating(&self, user_id: i32, store_id: i32, value: i32) -> RepoResult<Rating> {
        let sql = format!(
            r#"
            INSERT INTO ratings (rating, user_id, store_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, store_id)
            DO UPDATE SET rating = EXCLUDED.rating, updated_at = NOW()
            RETURNING {RATING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Rating>(&sql)
            .bind(value)
            .bind(user_id)
            .bind(store_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("upsert_rating"))
    }

    async fn store_ratings(&self, store_id: i32) -> RepoResult<Vec<RatingWithRater>> {
        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT r.id, r.rating, r.user_id, r.store_id, r.created_at, r.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM ratings r
            JOIN users u ON u.id = r.user_id
            WHERE r.store_id = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("store_ratings"))?;

        Ok(rows.into_iter().map(RatingWithRater::from).collect())
    }
}
