use std::{cmp::Ordering, collections::BTreeMap, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    models::{
        DashboardStats, NewStore, NewUser, Rating, RatingWithRater, Store, StorePatch, StoreView,
        User, UserProfile,
    },
    query::{
        Sort, SortOrder, StoreFilter, StoreSortField, UserFilter, UserSortField, contains_ci,
        role_matches,
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    stores: BTreeMap<i32, Store>,
    ratings: BTreeMap<i32, Rating>,
    next_user_id: i32,
    next_store_id: i32,
    next_rating_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn mean<I: IntoIterator<Item = i32>>(values: I) -> Decimal {
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), v| (sum + i64::from(v), count + 1));
    if count == 0 {
        Decimal::ZERO
    } else {
        // Same scale as Postgres AVG over integers.
        (Decimal::from(sum) / Decimal::from(count)).round_dp(16)
    }
}

fn apply_order(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }

    fn store_email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.stores
            .values()
            .any(|s| s.email == email && Some(s.id) != except)
    }

    fn insert_user(&mut self, user: NewUser) -> User {
        let now = Utc::now();
        let id = next_id(&mut self.next_user_id);
        let record = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            address: user.address,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, record.clone());
        record
    }

    fn insert_store(&mut self, store: NewStore) -> Store {
        let now = Utc::now();
        let id = next_id(&mut self.next_store_id);
        let record = Store {
            id,
            name: store.name,
            email: store.email,
            address: store.address,
            owner_id: store.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.stores.insert(id, record.clone());
        record
    }

    fn store_average(&self, store_id: i32) -> Decimal {
        mean(
            self.ratings
                .values()
                .filter(|r| r.store_id == store_id)
                .map(|r| r.rating),
        )
    }

    fn owner_average(&self, owner_id: i32) -> Decimal {
        mean(
            self.ratings
                .values()
                .filter(|r| {
                    self.stores
                        .get(&r.store_id)
                        .is_some_and(|s| s.owner_id == Some(owner_id))
                })
                .map(|r| r.rating),
        )
    }

    fn user_rating(&self, user_id: i32, store_id: i32) -> Option<i32> {
        self.ratings
            .values()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
            .map(|r| r.rating)
    }

    fn view(&self, store: &Store, caller: Option<i32>) -> StoreView {
        let owner = store
            .owner_id
            .and_then(|id| self.users.get(&id))
            .map(User::reference);
        StoreView {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
            address: store.address.clone(),
            owner_id: store.owner_id,
            owner,
            average_rating: self.store_average(store.id),
            user_rating: caller.map(|user_id| self.user_rating(user_id, store.id)),
        }
    }
}

/// MemoryRepository
///
/// In-process `Repository` with the same observable semantics as the Postgres
/// implementation: ids ascend from 1, emails are unique, the rating upsert happens under
/// one write lock, and deleting a store drops its ratings. Backs the test suite and
/// local runs without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, id: i32) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email) {
            return Err(RepositoryError::UniqueViolation(
                "A user with this email already exists.".to_string(),
            ));
        }
        Ok(tables.insert_user(user))
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        sort: Sort<UserSortField>,
    ) -> RepoResult<Vec<UserProfile>> {
        let tables = self.tables.read().await;
        let mut users: Vec<UserProfile> = tables
            .users
            .values()
            .filter(|u| filter.name.as_deref().is_none_or(|n| contains_ci(&u.name, n)))
            .filter(|u| filter.email.as_deref().is_none_or(|e| contains_ci(&u.email, e)))
            .filter(|u| {
                filter
                    .address
                    .as_deref()
                    .is_none_or(|a| contains_ci(&u.address, a))
            })
            .filter(|u| filter.role.as_deref().is_none_or(|r| role_matches(u.role, r)))
            .map(User::profile)
            .collect();

        // Stable sort over id-ordered input: ties stay in ascending id order.
        users.sort_by(|a, b| {
            let ordering = match sort.field {
                UserSortField::Id => a.id.cmp(&b.id),
                UserSortField::Name => a.name.cmp(&b.name),
                UserSortField::Email => a.email.cmp(&b.email),
                UserSortField::Address => a.address.cmp(&b.address),
                UserSortField::Role => a.role.as_str().cmp(b.role.as_str()),
            };
            apply_order(ordering, sort.order)
        });
        Ok(users)
    }

    async fn owner_averages(&self, owner_ids: &[i32]) -> RepoResult<HashMap<i32, Decimal>> {
        let tables = self.tables.read().await;
        Ok(owner_ids
            .iter()
            .filter(|&&id| tables.users.contains_key(&id))
            .map(|&id| (id, tables.owner_average(id)))
            .collect())
    }

    async fn owner_average(&self, owner_id: i32) -> RepoResult<Decimal> {
        Ok(self.tables.read().await.owner_average(owner_id))
    }

    async fn store_average(&self, store_id: i32) -> RepoResult<Decimal> {
        Ok(self.tables.read().await.store_average(store_id))
    }

    async fn user_rating(&self, user_id: i32, store_id: i32) -> RepoResult<Option<i32>> {
        Ok(self.tables.read().await.user_rating(user_id, store_id))
    }

    async fn counts(&self) -> RepoResult<DashboardStats> {
        let tables = self.tables.read().await;
        Ok(DashboardStats {
            users_count: tables.users.len() as i64,
            stores_count: tables.stores.len() as i64,
            ratings_count: tables.ratings.len() as i64,
        })
    }

    async fn find_store(&self, id: i32) -> RepoResult<Option<Store>> {
        Ok(self.tables.read().await.stores.get(&id).cloned())
    }

    async fn store_for_owner(&self, owner_id: i32) -> RepoResult<Option<Store>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stores
            .values()
            .find(|s| s.owner_id == Some(owner_id))
            .cloned())
    }

    async fn create_store(&self, store: NewStore) -> RepoResult<Store> {
        let mut tables = self.tables.write().await;
        if tables.store_email_taken(&store.email, None) {
            return Err(RepositoryError::UniqueViolation(
                "A store with this email already exists.".to_string(),
            ));
        }
        Ok(tables.insert_store(store))
    }

    async fn create_store_with_owner(
        &self,
        owner: NewUser,
        store: NewStore,
    ) -> RepoResult<(User, Store)> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&owner.email) {
            return Err(RepositoryError::UniqueViolation(
                "A user with this email already exists.".to_string(),
            ));
        }
        if tables.store_email_taken(&store.email, None) {
            return Err(RepositoryError::UniqueViolation(
                "A store with this email already exists.".to_string(),
            ));
        }
        let user = tables.insert_user(owner);
        let store = tables.insert_store(NewStore {
            owner_id: Some(user.id),
            ..store
        });
        Ok((user, store))
    }

    async fn update_store(&self, id: i32, patch: StorePatch) -> RepoResult<Option<Store>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &patch.email {
            if tables.store_email_taken(email, Some(id)) {
                return Err(RepositoryError::UniqueViolation(
                    "A store with this email already exists.".to_string(),
                ));
            }
        }
        let Some(store) = tables.stores.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            store.name = name;
        }
        if let Some(email) = patch.email {
            store.email = email;
        }
        if let Some(address) = patch.address {
            store.address = address;
        }
        if let Some(owner_id) = patch.owner_id {
            store.owner_id = owner_id;
        }
        store.updated_at = Utc::now();
        Ok(Some(store.clone()))
    }

    async fn delete_store(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.stores.remove(&id).is_none() {
            return Ok(false);
        }
        tables.ratings.retain(|_, r| r.store_id != id);
        Ok(true)
    }

    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: Sort<StoreSortField>,
        caller: Option<i32>,
    ) -> RepoResult<Vec<StoreView>> {
        let tables = self.tables.read().await;
        let mut views: Vec<StoreView> = tables
            .stores
            .values()
            .filter(|s| filter.name.as_deref().is_none_or(|n| contains_ci(&s.name, n)))
            .filter(|s| filter.email.as_deref().is_none_or(|e| contains_ci(&s.email, e)))
            .filter(|s| {
                filter
                    .address
                    .as_deref()
                    .is_none_or(|a| contains_ci(&s.address, a))
            })
            .map(|s| tables.view(s, caller))
            .collect();

        views.sort_by(|a, b| {
            let ordering = match sort.field {
                StoreSortField::Id => a.id.cmp(&b.id),
                StoreSortField::Name => a.name.cmp(&b.name),
                StoreSortField::Email => a.email.cmp(&b.email),
                StoreSortField::Address => a.address.cmp(&b.address),
                StoreSortField::AverageRating => a.average_rating.cmp(&b.average_rating),
            };
            apply_order(ordering, sort.order)
        });
        Ok(views)
    }

    async fn store_view(&self, id: i32, caller: Option<i32>) -> RepoResult<Option<StoreView>> {
        let tables = self.tables.read().await;
        Ok(tables.stores.get(&id).map(|s| tables.view(s, caller)))
    }

    async fn upsert_rating(&self, user_id: i32, store_id: i32, value: i32) -> RepoResult<Rating> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(existing) = tables
            .ratings
            .values_mut()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
        {
            existing.rating = value;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let id = next_id(&mut tables.next_rating_id);
        let rating = Rating {
            id,
            rating: value,
            user_id,
            store_id,
            created_at: now,
            updated_at: now,
        };
        tables.ratings.insert(id, rating.clone());
        Ok(rating)
    }

    async fn store_ratings(&self, store_id: i32) -> RepoResult<Vec<RatingWithRater>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .values()
            .filter(|r| r.store_id == store_id)
            .filter_map(|r| {
                let rater = tables.users.get(&r.user_id)?;
                Some(RatingWithRater {
                    id: r.id,
                    rating: r.rating,
                    user_id: r.user_id,
                    store_id: r.store_id,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    user: rater.reference(),
                })
            })
            .collect())
    }
}
