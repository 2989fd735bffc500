//! Postgres-backed repository tests. They need a reachable database:
//!
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use std::time::{SystemTime, UNIX_EPOCH};
use store_ratings::{
    PostgresRepository,
    models::{NewStore, NewUser, Role, StorePatch},
    query::{Sort, SortOrder, StoreFilter, StoreSortField, UserFilter, UserSortField},
    repository::{Repository, RepositoryError},
};

async fn setup() -> PostgresRepository {
    dotenv::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    PostgresRepository::new(pool)
}

/// Unique suffix so runs never collide on the email constraints.
fn unique(label: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}@it.example.com", label, nanos)
}

fn new_user(email: &str, role: Role) -> NewUser {
    NewUser {
        name: "Integration Test Account".to_string(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        address: "1 Integration Road".to_string(),
        role,
    }
}

fn new_store(email: &str, owner_id: Option<i32>) -> NewStore {
    NewStore {
        name: format!("Integration Store {}", email),
        email: email.to_string(),
        address: "2 Integration Road".to_string(),
        owner_id,
    }
}

#[tokio::test]
#[ignore]
async fn test_upsert_keeps_one_row_per_user_and_store() {
    let repo = setup().await;
    let user = repo.create_user(new_user(&unique("rater"), Role::NormalUser)).await.unwrap();
    let store = repo.create_store(new_store(&unique("store"), None)).await.unwrap();

    let first = repo.upsert_rating(user.id, store.id, 1).await.unwrap();
    let second = repo.upsert_rating(user.id, store.id, 4).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.rating, 4);
    assert_eq!(repo.user_rating(user.id, store.id).await.unwrap(), Some(4));
    assert_eq!(repo.store_average(store.id).await.unwrap(), Decimal::from(4));
    assert_eq!(repo.store_ratings(store.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_owner_average_is_pooled() {
    let repo = setup().await;
    let owner = repo.create_user(new_user(&unique("owner"), Role::StoreOwner)).await.unwrap();
    let a = repo.create_store(new_store(&unique("a"), Some(owner.id))).await.unwrap();
    let b = repo.create_store(new_store(&unique("b"), Some(owner.id))).await.unwrap();

    let mut raters = Vec::new();
    for i in 0..3 {
        raters.push(
            repo.create_user(new_user(&unique(&format!("r{}", i)), Role::NormalUser))
                .await
                .unwrap(),
        );
    }
    repo.upsert_rating(raters[0].id, a.id, 5).await.unwrap();
    for rater in &raters {
        repo.upsert_rating(rater.id, b.id, 1).await.unwrap();
    }

    assert_eq!(repo.owner_average(owner.id).await.unwrap(), Decimal::from(2));
    let batched = repo.owner_averages(&[owner.id]).await.unwrap();
    assert_eq!(batched.get(&owner.id).copied(), Some(Decimal::from(2)));
}

#[tokio::test]
#[ignore]
async fn test_unrated_aggregates_are_zero() {
    let repo = setup().await;
    let owner = repo.create_user(new_user(&unique("idle"), Role::StoreOwner)).await.unwrap();
    let store = repo.create_store(new_store(&unique("empty"), None)).await.unwrap();

    assert_eq!(repo.store_average(store.id).await.unwrap(), Decimal::ZERO);
    assert_eq!(repo.owner_average(owner.id).await.unwrap(), Decimal::ZERO);
    let batched = repo.owner_averages(&[owner.id]).await.unwrap();
    assert_eq!(batched.get(&owner.id).copied().unwrap_or_default(), Decimal::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_unique_violation() {
    let repo = setup().await;
    let email = unique("dup");
    repo.create_user(new_user(&email, Role::NormalUser)).await.unwrap();

    let err = repo.create_user(new_user(&email, Role::NormalUser)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueViolation(_)));
}

#[tokio::test]
#[ignore]
async fn test_store_with_owner_rolls_back_on_conflict() {
    let repo = setup().await;
    let store_email = unique("taken-store");
    repo.create_store(new_store(&store_email, None)).await.unwrap();

    let owner_email = unique("orphan");
    let err = repo
        .create_store_with_owner(
            new_user(&owner_email, Role::StoreOwner),
            new_store(&store_email, None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueViolation(_)));

    // The owner insert was part of the failed transaction.
    assert!(repo.find_user_by_email(&owner_email).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_store_view_filters_and_caller_rating() {
    let repo = setup().await;
    let caller = repo.create_user(new_user(&unique("caller"), Role::NormalUser)).await.unwrap();
    let email = unique("viewed");
    let store = repo.create_store(new_store(&email, None)).await.unwrap();
    repo.upsert_rating(caller.id, store.id, 3).await.unwrap();

    let anonymous = repo.store_view(store.id, None).await.unwrap().unwrap();
    assert_eq!(anonymous.user_rating, None);
    let identified = repo.store_view(store.id, Some(caller.id)).await.unwrap().unwrap();
    assert_eq!(identified.user_rating, Some(Some(3)));

    let filter = StoreFilter {
        email: Some(email.to_uppercase()),
        ..Default::default()
    };
    let sort = Sort {
        field: StoreSortField::AverageRating,
        order: SortOrder::Desc,
    };
    let listed = repo.list_stores(&filter, sort, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].average_rating, Decimal::from(3));

    let renamed = repo
        .update_store(
            store.id,
            StorePatch {
                address: Some("3 Patched Road".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.address, "3 Patched Road");
    assert_eq!(renamed.email, email);

    assert!(repo.delete_store(store.id).await.unwrap());
    assert_eq!(repo.user_rating(caller.id, store.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_user_listing_escapes_like_wildcards() {
    let repo = setup().await;
    repo.create_user(new_user(&unique("plain"), Role::NormalUser)).await.unwrap();

    let filter = UserFilter {
        email: Some("%".to_string()),
        ..Default::default()
    };
    let sort = Sort {
        field: UserSortField::Name,
        order: SortOrder::Asc,
    };
    let users = repo.list_users(&filter, sort).await.unwrap();
    assert!(users.iter().all(|u| u.email.contains('%')));
}
