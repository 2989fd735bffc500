use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{validate_password, validate_role};

// --- Roles ---

/// Role
///
/// The three account kinds. Every protected operation names an explicit allow-list of
/// these (see `auth::RolePolicy`). The JSON and database labels keep the human-readable
/// spelling used by existing clients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role")]
#[ts(export)]
pub enum Role {
    #[serde(rename = "System Administrator")]
    #[sqlx(rename = "System Administrator")]
    SystemAdministrator,
    #[serde(rename = "Normal User")]
    #[sqlx(rename = "Normal User")]
    NormalUser,
    #[serde(rename = "Store Owner")]
    #[sqlx(rename = "Store Owner")]
    StoreOwner,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SystemAdministrator, Role::NormalUser, Role::StoreOwner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdministrator => "System Administrator",
            Role::NormalUser => "Normal User",
            Role::StoreOwner => "Store Owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// --- Stored records ---

/// User
///
/// Full account row including the bcrypt hash. Never serialized; handlers return
/// `UserProfile` or one of the listing projections instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            role: self.role,
        }
    }

    pub fn reference(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// NewUser
///
/// Insert payload for the repository. The password is already hashed by the time it
/// gets here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub role: Role,
}

/// Store
///
/// Row from the `stores` table. `owner_id` must point at a Store Owner when set; the
/// check lives in `services::stores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Store {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: String,
    pub owner_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub email: String,
    pub address: String,
    pub owner_id: Option<i32>,
}

/// StorePatch
///
/// Partial update. `None` leaves the column unchanged. `owner_id: Some(None)` clears the
/// owner.
#[derive(Debug, Clone, Default)]
pub struct StorePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub owner_id: Option<Option<i32>>,
}

/// Rating
///
/// At most one row per (user_id, store_id); resubmitting overwrites `rating` and bumps
/// `updated_at` while `id` stays the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Rating {
    pub id: i32,
    pub rating: i32,
    pub user_id: i32,
    pub store_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Projections ---

/// UserProfile
///
/// The public face of an account: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: String,
    pub role: Role,
}

/// UserRef
///
/// Compact identity attached to stores (their owner) and ratings (the rater).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct UserRef {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// UserListEntry
///
/// Row of the admin user directory. `averageRating` is only present for Store Owners
/// and is the mean over every rating of every store they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserListEntry {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "number")]
    pub average_rating: Option<Decimal>,
}

/// UserDetail
///
/// Admin view of one account. Store Owners additionally carry `storeRating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserDetail {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "number")]
    pub store_rating: Option<Decimal>,
}

/// StoreView
///
/// Read model for store listings and details: the store joined with its owner and the
/// aggregate computed by the repository.
///
/// `user_rating` is tri-state on the wire:
/// - absent: the caller was anonymous,
/// - `null`: the caller was identified but has not rated this store,
/// - a number: the caller's own rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: String,
    pub owner_id: Option<i32>,
    pub owner: Option<UserRef>,
    #[ts(type = "number")]
    pub average_rating: Decimal,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    #[schema(value_type = Option<i32>)]
    #[ts(optional)]
    pub user_rating: Option<Option<i32>>,
}

/// Keeps an explicit `null` distinct from a missing key (`userRating`, `ownerId` updates).
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

/// RatingWithRater
///
/// A rating enriched with who submitted it, for the owner/admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RatingWithRater {
    pub id: i32,
    pub rating: i32,
    pub user_id: i32,
    pub store_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub user: UserRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub users_count: i64,
    pub stores_count: i64,
    pub ratings_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct StoreDashboard {
    pub ratings: Vec<RatingWithRater>,
    #[ts(type = "number")]
    pub average: Decimal,
}

// --- Request payloads ---

/// SignupRequest
///
/// Self-service registration. Always creates a Normal User. Note the 20-60 name rule,
/// which differs from the 10-40 rule for admin-created accounts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(length(min = 20, max = 60, message = "Name must be 20-60 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom = "validate_password")]
    pub new_password: String,
}

/// CreateUserRequest
///
/// Admin-created account of any role. `role` is kept as a string so an unknown label is
/// reported alongside the other field errors instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(min = 10, max = 40, message = "Name must be 10-40 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    #[validate(custom = "validate_role")]
    pub role: String,
}

/// NewOwnerRequest
///
/// Inline Store Owner account created together with a store. Fields are optional at
/// the wire level; completeness is checked by the ownership workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, TS)]
#[ts(export)]
pub struct NewOwnerRequest {
    #[validate(length(min = 10, max = 40, message = "owner.name must be 10-40 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "owner.email must be a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "owner.password must be at least 6 chars"))]
    pub password: Option<String>,
    #[validate(length(max = 400, message = "owner.address must be at most 400 characters"))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateStoreRequest {
    #[validate(length(min = 20, max = 60, message = "Name must be 20-60 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "ownerId must be a valid user id"))]
    pub owner_id: Option<i32>,
    #[serde(default)]
    #[validate]
    pub owner: Option<NewOwnerRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateStoreRequest {
    #[validate(length(min = 20, max = 60, message = "Name must be 20-60 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
    /// Absent keeps the current owner, `null` unassigns it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    #[schema(value_type = Option<i32>)]
    #[ts(optional)]
    pub owner_id: Option<Option<i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmitRatingRequest {
    #[validate(range(min = 1, message = "storeId must be a valid integer"))]
    pub store_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be an integer between 1 and 5"))]
    pub rating: i32,
}

// --- Response bodies ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct RatingSavedResponse {
    pub message: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct UserRatingResponse {
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct AverageResponse {
    #[ts(type = "number")]
    pub average: Decimal,
}
