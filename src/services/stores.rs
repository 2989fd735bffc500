use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{
        CreateStoreRequest, NewOwnerRequest, NewStore, NewUser, Role, Store, StoreDashboard,
        StorePatch, StoreView, UpdateStoreRequest,
    },
    repository::Repository,
    services::{accounts::hash_password, ratings},
};

pub const INVALID_OWNER: &str = "ownerId must reference a valid Store Owner";
pub const MISSING_OWNER: &str = "Please provide either ownerId or all new owner details (name, email, password, address).";
pub const DUPLICATE_OWNER_EMAIL: &str = "A user with this email already exists.";

/// Fails with `InvalidArgument` unless `owner_id` is an existing Store Owner.
async fn ensure_store_owner(repo: &dyn Repository, owner_id: i32) -> Result<(), ApiError> {
    match repo.find_user(owner_id).await? {
        Some(user) if user.role == Role::StoreOwner => Ok(()),
        _ => Err(ApiError::InvalidArgument(INVALID_OWNER.to_string())),
    }
}

/// All four inline owner fields, or none at all.
fn complete_owner(owner: Option<NewOwnerRequest>) -> Option<(String, String, String, String)> {
    let owner = owner?;
    Some((owner.name?, owner.email?, owner.password?, owner.address?))
}

/// create_store
///
/// Exactly one ownership path has to resolve:
/// 1. `ownerId` naming an existing Store Owner (checked first when both are sent), or
/// 2. a complete inline `owner`, which creates a new Store Owner account in the same
///    transaction as the store.
pub async fn create_store(
    repo: &dyn Repository,
    bcrypt_cost: u32,
    req: CreateStoreRequest,
) -> Result<Store, ApiError> {
    let CreateStoreRequest {
        name,
        email,
        address,
        owner_id,
        owner,
    } = req;

    if let Some(owner_id) = owner_id {
        ensure_store_owner(repo, owner_id).await?;
        let store = repo
            .create_store(NewStore {
                name,
                email,
                address,
                owner_id: Some(owner_id),
            })
            .await?;
        tracing::info!(store_id = store.id, owner_id, "store created");
        return Ok(store);
    }

    let Some((owner_name, owner_email, owner_password, owner_address)) = complete_owner(owner)
    else {
        return Err(ApiError::InvalidArgument(MISSING_OWNER.to_string()));
    };

    if repo.find_user_by_email(&owner_email).await?.is_some() {
        return Err(ApiError::Conflict(DUPLICATE_OWNER_EMAIL.to_string()));
    }

    let password_hash = hash_password(owner_password, bcrypt_cost).await?;
    let (owner, store) = repo
        .create_store_with_owner(
            NewUser {
                name: owner_name,
                email: owner_email,
                password_hash,
                address: owner_address,
                role: Role::StoreOwner,
            },
            NewStore {
                name,
                email,
                address,
                owner_id: None,
            },
        )
        .await?;

    tracing::info!(store_id = store.id, owner_id = owner.id, "store created with new owner");
    Ok(store)
}

/// update_store
///
/// Partial update. A new `ownerId` is validated the same way as on creation.
pub async fn update_store(
    repo: &dyn Repository,
    id: i32,
    req: UpdateStoreRequest,
) -> Result<Store, ApiError> {
    if repo.find_store(id).await?.is_none() {
        return Err(ApiError::NotFound("Store not found".to_string()));
    }
    if let Some(Some(owner_id)) = req.owner_id {
        ensure_store_owner(repo, owner_id).await?;
    }

    let patch = StorePatch {
        name: req.name,
        email: req.email,
        address: req.address,
        owner_id: req.owner_id,
    };

    let store = repo
        .update_store(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;
    tracing::info!(store_id = id, "store updated");
    Ok(store)
}

pub async fn delete_store(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.delete_store(id).await? {
        return Err(ApiError::NotFound("Store not found".to_string()));
    }
    tracing::info!(store_id = id, "store deleted");
    Ok(())
}

/// my_store
///
/// The caller's first store (lowest id) with its average rating.
pub async fn my_store(repo: &dyn Repository, owner_id: i32) -> Result<StoreView, ApiError> {
    let store = repo
        .store_for_owner(owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No store found for this owner".to_string()))?;

    repo.store_view(store.id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))
}

/// owner_dashboard
///
/// Every rating of a store together with its rater, plus the store average. Store Owners
/// may only open their own store; administrators may open any.
pub async fn owner_dashboard(
    repo: &dyn Repository,
    caller: AuthUser,
    store_id: i32,
) -> Result<StoreDashboard, ApiError> {
    let store = repo
        .find_store(store_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    if caller.role == Role::StoreOwner && store.owner_id != Some(caller.id) {
        tracing::warn!(user_id = caller.id, store_id, "owner dashboard for foreign store");
        return Err(ApiError::Forbidden(
            "You can only view your own store".to_string(),
        ));
    }

    let ratings = ratings::all_ratings_for_store(repo, store_id).await?;
    let average = ratings::average_for_store(repo, store_id).await?;
    Ok(StoreDashboard { ratings, average })
}
