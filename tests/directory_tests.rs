use rust_decimal::Decimal;
use store_ratings::{
    ApiError, MemoryRepository,
    models::{NewStore, NewUser, Role, Store, User},
    query::{SortOrder, StoreQuery, UserQuery},
    repository::Repository,
    services::{directory, ratings},
};

// --- Seeding ---

async fn seed_user(repo: &dyn Repository, name: &str, email: &str, role: Role) -> User {
    repo.create_user(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        address: format!("{} Avenue", name),
        role,
    })
    .await
    .unwrap()
}

async fn seed_store(
    repo: &dyn Repository,
    name: &str,
    address: &str,
    owner_id: Option<i32>,
) -> Store {
    repo.create_store(NewStore {
        name: name.to_string(),
        email: format!("{}@shops.example.com", name.to_lowercase().replace(' ', ".")),
        address: address.to_string(),
        owner_id,
    })
    .await
    .unwrap()
}

fn user_query(order_by: Option<&str>, order: Option<&str>) -> UserQuery {
    UserQuery {
        order_by: order_by.map(str::to_string),
        order: order.map(str::to_string),
        ..Default::default()
    }
}

// --- Users ---

#[tokio::test]
async fn test_user_listing_falls_back_to_name_ascending() {
    let repo = MemoryRepository::new();
    seed_user(&repo, "Charlie Directory", "c@example.com", Role::NormalUser).await;
    seed_user(&repo, "Alice Directory", "a@example.com", Role::NormalUser).await;
    seed_user(&repo, "Bob Directory", "b@example.com", Role::NormalUser).await;

    let q = user_query(Some("password_hash"), Some("sideways"));
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();

    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["Alice Directory", "Bob Directory", "Charlie Directory"]);
}

#[tokio::test]
async fn test_user_listing_sorts_descending_by_email() {
    let repo = MemoryRepository::new();
    seed_user(&repo, "First Person", "a@example.com", Role::NormalUser).await;
    seed_user(&repo, "Second Person", "c@example.com", Role::NormalUser).await;
    seed_user(&repo, "Third Person", "b@example.com", Role::NormalUser).await;

    let q = user_query(Some("email"), Some("desc"));
    assert_eq!(q.sort().order, SortOrder::Desc);
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();

    let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, ["c@example.com", "b@example.com", "a@example.com"]);
}

#[tokio::test]
async fn test_equal_sort_keys_keep_id_order() {
    let repo = MemoryRepository::new();
    let first = seed_user(&repo, "Same Name Twice", "one@example.com", Role::NormalUser).await;
    let second = seed_user(&repo, "Same Name Twice", "two@example.com", Role::NormalUser).await;

    let q = user_query(Some("name"), None);
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();
    assert_eq!(users[0].id, first.id);
    assert_eq!(users[1].id, second.id);
}

#[tokio::test]
async fn test_user_filters_are_case_insensitive_substrings() {
    let repo = MemoryRepository::new();
    seed_user(&repo, "Olivia Owner", "olivia@example.com", Role::StoreOwner).await;
    seed_user(&repo, "Norman Normal", "norman@example.com", Role::NormalUser).await;

    let q = UserQuery {
        role: Some("store OWN".to_string()),
        ..Default::default()
    };
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].role, Role::StoreOwner);

    let q = UserQuery {
        name: Some("NORM".to_string()),
        email: Some("Example".to_string()),
        ..Default::default()
    };
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Norman Normal");
}

#[tokio::test]
async fn test_only_owners_carry_average_rating() {
    let repo = MemoryRepository::new();
    let rated_owner = seed_user(&repo, "Rated Owner", "rated@example.com", Role::StoreOwner).await;
    let idle_owner = seed_user(&repo, "Idle Owner", "idle@example.com", Role::StoreOwner).await;
    let rater = seed_user(&repo, "Regular Rater", "rater@example.com", Role::NormalUser).await;
    let store = seed_store(&repo, "Rated Owner Flagship", "Main St", Some(rated_owner.id)).await;
    ratings::submit_rating(&repo, rater.id, store.id, 4).await.unwrap();

    let q = UserQuery::default();
    let users = directory::list_users(&repo, &q.filter(), q.sort()).await.unwrap();

    let find = |id: i32| users.iter().find(|u| u.id == id).unwrap();
    assert_eq!(find(rated_owner.id).average_rating, Some(Decimal::from(4)));
    assert_eq!(find(idle_owner.id).average_rating, Some(Decimal::ZERO));
    assert_eq!(find(rater.id).average_rating, None);
}

#[tokio::test]
async fn test_user_detail_includes_owner_store_rating() {
    let repo = MemoryRepository::new();
    let owner = seed_user(&repo, "Detail Owner", "detail@example.com", Role::StoreOwner).await;
    let rater = seed_user(&repo, "Detail Rater", "drater@example.com", Role::NormalUser).await;
    let store = seed_store(&repo, "Detail Owner Outlet", "High St", Some(owner.id)).await;
    ratings::submit_rating(&repo, rater.id, store.id, 3).await.unwrap();

    let detail = directory::get_user_detail(&repo, owner.id).await.unwrap();
    assert_eq!(detail.store_rating, Some(Decimal::from(3)));

    let detail = directory::get_user_detail(&repo, rater.id).await.unwrap();
    assert_eq!(detail.store_rating, None);

    let err = directory::get_user_detail(&repo, 404).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// --- Stores ---

#[tokio::test]
async fn test_store_listing_filters_by_name_and_address() {
    let repo = MemoryRepository::new();
    seed_store(&repo, "Green Grocer", "12 Park Lane", None).await;
    seed_store(&repo, "Green Hardware", "4 Dock Road", None).await;
    seed_store(&repo, "Blue Bakery", "9 Park Lane", None).await;

    let q = StoreQuery {
        name: Some("green".to_string()),
        address: Some("PARK".to_string()),
        ..Default::default()
    };
    let stores = directory::list_stores(&repo, &q.public_filter(), q.public_sort(), None)
        .await
        .unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].name, "Green Grocer");
}

#[tokio::test]
async fn test_store_listing_sorts_by_average_rating() {
    let repo = MemoryRepository::new();
    let low = seed_store(&repo, "Low Rated Place", "A St", None).await;
    let high = seed_store(&repo, "High Rated Place", "B St", None).await;
    let unrated = seed_store(&repo, "Unrated Place", "C St", None).await;
    let rater = seed_user(&repo, "Sorting Rater", "sorter@example.com", Role::NormalUser).await;
    ratings::submit_rating(&repo, rater.id, low.id, 2).await.unwrap();
    ratings::submit_rating(&repo, rater.id, high.id, 5).await.unwrap();

    let q = StoreQuery {
        order_by: Some("averageRating".to_string()),
        order: Some("DESC".to_string()),
        ..Default::default()
    };
    let stores = directory::list_stores(&repo, &q.public_filter(), q.public_sort(), None)
        .await
        .unwrap();

    let ids: Vec<i32> = stores.iter().map(|s| s.id).collect();
    assert_eq!(ids, [high.id, low.id, unrated.id]);
    assert_eq!(stores[2].average_rating, Decimal::ZERO);
}

#[tokio::test]
async fn test_user_rating_is_tri_state() {
    let repo = MemoryRepository::new();
    let rated = seed_store(&repo, "Rated By Caller", "A St", None).await;
    let unrated = seed_store(&repo, "Not Rated By Caller", "B St", None).await;
    let caller = seed_user(&repo, "Calling User", "caller@example.com", Role::NormalUser).await;
    ratings::submit_rating(&repo, caller.id, rated.id, 4).await.unwrap();

    let q = StoreQuery::default();

    // Anonymous: no userRating at all.
    let anonymous = directory::list_stores(&repo, &q.public_filter(), q.public_sort(), None)
        .await
        .unwrap();
    assert!(anonymous.iter().all(|s| s.user_rating.is_none()));

    // Identified: the caller's value, or an explicit null.
    let identified =
        directory::list_stores(&repo, &q.public_filter(), q.public_sort(), Some(caller.id))
            .await
            .unwrap();
    let find = |id: i32| identified.iter().find(|s| s.id == id).unwrap();
    assert_eq!(find(rated.id).user_rating, Some(Some(4)));
    assert_eq!(find(unrated.id).user_rating, Some(None));
}

#[tokio::test]
async fn test_store_view_json_omits_or_nulls_user_rating() {
    let repo = MemoryRepository::new();
    let store = seed_store(&repo, "Serialized Store Name", "A St", None).await;
    let caller = seed_user(&repo, "Json Caller", "json@example.com", Role::NormalUser).await;

    let anonymous = directory::get_store(&repo, store.id, None).await.unwrap();
    let json = serde_json::to_value(&anonymous).unwrap();
    assert!(json.get("userRating").is_none());
    assert_eq!(json["averageRating"], serde_json::json!(0.0));

    let identified = directory::get_store(&repo, store.id, Some(caller.id))
        .await
        .unwrap();
    let json = serde_json::to_value(&identified).unwrap();
    assert!(json.get("userRating").unwrap().is_null());
}

#[tokio::test]
async fn test_store_view_carries_owner_summary() {
    let repo = MemoryRepository::new();
    let owner = seed_user(&repo, "Summary Owner", "summary@example.com", Role::StoreOwner).await;
    let store = seed_store(&repo, "Summary Owner Store", "A St", Some(owner.id)).await;

    let view = directory::get_store(&repo, store.id, None).await.unwrap();
    let summary = view.owner.unwrap();
    assert_eq!(summary.id, owner.id);
    assert_eq!(summary.email, "summary@example.com");
}

#[tokio::test]
async fn test_missing_store_is_not_found() {
    let repo = MemoryRepository::new();
    let err = directory::get_store(&repo, 12, None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_dashboard_counts_everything() {
    let repo = MemoryRepository::new();
    let user = seed_user(&repo, "Counted User", "counted@example.com", Role::NormalUser).await;
    seed_user(&repo, "Counted Owner", "cowner@example.com", Role::StoreOwner).await;
    let store = seed_store(&repo, "Counted Store", "A St", None).await;
    ratings::submit_rating(&repo, user.id, store.id, 1).await.unwrap();

    let stats = directory::dashboard(&repo).await.unwrap();
    assert_eq!(stats.users_count, 2);
    assert_eq!(stats.stores_count, 1);
    assert_eq!(stats.ratings_count, 1);
}
