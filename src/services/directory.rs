use crate::{
    error::ApiError,
    models::{DashboardStats, Role, StoreView, UserDetail, UserListEntry},
    query::{Sort, StoreFilter, StoreSortField, UserFilter, UserSortField},
    repository::Repository,
};

/// list_users
///
/// Admin user directory. Store Owners get `averageRating` attached from one batched
/// aggregate query covering every owner in the page.
pub async fn list_users(
    repo: &dyn Repository,
    filter: &UserFilter,
    sort: Sort<UserSortField>,
) -> Result<Vec<UserListEntry>, ApiError> {
    let users = repo.list_users(filter, sort).await?;

    let owner_ids: Vec<i32> = users
        .iter()
        .filter(|user| user.role == Role::StoreOwner)
        .map(|user| user.id)
        .collect();

    let averages = if owner_ids.is_empty() {
        Default::default()
    } else {
        repo.owner_averages(&owner_ids).await?
    };

    Ok(users
        .into_iter()
        .map(|user| {
            let average_rating = (user.role == Role::StoreOwner)
                .then(|| averages.get(&user.id).copied().unwrap_or_default());
            UserListEntry {
                id: user.id,
                name: user.name,
                email: user.email,
                address: user.address,
                role: user.role,
                average_rating,
            }
        })
        .collect())
}

pub async fn list_stores(
    repo: &dyn Repository,
    filter: &StoreFilter,
    sort: Sort<StoreSortField>,
    caller: Option<i32>,
) -> Result<Vec<StoreView>, ApiError> {
    Ok(repo.list_stores(filter, sort, caller).await?)
}

pub async fn get_store(
    repo: &dyn Repository,
    id: i32,
    caller: Option<i32>,
) -> Result<StoreView, ApiError> {
    repo.store_view(id, caller)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))
}

/// get_user_detail
///
/// One account as seen by an administrator. Store Owners carry `storeRating`, the
/// aggregate over all their stores.
pub async fn get_user_detail(repo: &dyn Repository, id: i32) -> Result<UserDetail, ApiError> {
    let user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let store_rating = match user.role {
        Role::StoreOwner => Some(repo.owner_average(user.id).await?),
        _ => None,
    };

    Ok(UserDetail {
        id: user.id,
        name: user.name,
        email: user.email,
        address: user.address,
        role: user.role,
        store_rating,
    })
}

pub async fn dashboard(repo: &dyn Repository) -> Result<DashboardStats, ApiError> {
    Ok(repo.counts().await?)
}
