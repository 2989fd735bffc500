//! Router Module Index
//!
//! Routes are grouped by the role set that may call them. Each group is a plain
//! `Router<AppState>`; `create_router` attaches the matching `auth::require::<Policy>`
//! route layer, so the permitted roles for every endpoint are decided in one place.

/// Routes open to anonymous callers. Store reads use optional identity.
pub mod public;

/// Routes for any authenticated caller (`AnyRole`).
pub mod authenticated;

/// Routes restricted to System Administrators (`AdminOnly`).
pub mod admin;

/// Routes restricted to Normal Users (`NormalUserOnly`).
pub mod normal_user;

/// Store-owner routes: `StoreOwnerOnly` and `OwnerOrAdmin`.
pub mod store_owner;
