use rust_decimal::Decimal;

use crate::{
    error::ApiError,
    models::{Rating, RatingWithRater},
    repository::Repository,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// submit_rating
///
/// Insert-or-overwrite of the caller's rating for a store. A second submission for the
/// same (user, store) pair replaces the value on the existing row.
pub async fn submit_rating(
    repo: &dyn Repository,
    user_id: i32,
    store_id: i32,
    value: i32,
) -> Result<Rating, ApiError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(ApiError::InvalidArgument(
            "Rating must be an integer between 1 and 5".to_string(),
        ));
    }

    if repo.find_store(store_id).await?.is_none() {
        return Err(ApiError::NotFound("Store not found".to_string()));
    }

    let rating = repo.upsert_rating(user_id, store_id, value).await?;
    tracing::info!(user_id, store_id, rating = value, rating_id = rating.id, "rating saved");
    Ok(rating)
}

/// Mean of a store's ratings; zero when it has none.
pub async fn average_for_store(repo: &dyn Repository, store_id: i32) -> Result<Decimal, ApiError> {
    Ok(repo.store_average(store_id).await?)
}

/// Mean over every rating of every store the owner has; zero with no stores or ratings.
pub async fn average_for_owner(repo: &dyn Repository, owner_id: i32) -> Result<Decimal, ApiError> {
    Ok(repo.owner_average(owner_id).await?)
}

pub async fn rating_by_user_for_store(
    repo: &dyn Repository,
    user_id: i32,
    store_id: i32,
) -> Result<Option<i32>, ApiError> {
    Ok(repo.user_rating(user_id, store_id).await?)
}

pub async fn all_ratings_for_store(
    repo: &dyn Repository,
    store_id: i32,
) -> Result<Vec<RatingWithRater>, ApiError> {
    Ok(repo.store_ratings(store_id).await?)
}
