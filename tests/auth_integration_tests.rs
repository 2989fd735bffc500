use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, Request, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use store_ratings::{
    ApiError, AppConfig, AppState, MemoryRepository, RepositoryState,
    auth::{
        AdminOnly, AnyRole, AuthUser, Claims, MaybeAuthUser, NormalUserOnly, OwnerOrAdmin,
        RolePolicy, StoreOwnerOnly, TokenError, TokenService, authorize, identify_optional,
    },
    models::Role,
};

const SECRET: &str = "test-secret-for-auth-tests";

// --- Helpers ---

fn test_state() -> AppState {
    AppState::new(
        Arc::new(MemoryRepository::new()) as RepositoryState,
        AppConfig::default(),
    )
}

fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

fn parts_with_auth(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// --- Token Service ---

#[test]
fn test_issue_then_verify_returns_same_identity() {
    let tokens = TokenService::new(SECRET, None);
    let token = tokens.issue(42, Role::StoreOwner).unwrap();

    let user = tokens.verify(&token).unwrap();
    assert_eq!(user, AuthUser { id: 42, role: Role::StoreOwner });
}

#[test]
fn test_token_signed_with_other_secret_is_invalid() {
    let issuer = TokenService::new("some-other-secret", None);
    let token = issuer.issue(1, Role::SystemAdministrator).unwrap();

    let verifier = TokenService::new(SECRET, None);
    assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid(_))));
}

#[test]
fn test_malformed_token_is_invalid() {
    let tokens = TokenService::new(SECRET, None);
    assert!(matches!(tokens.verify("not.a.jwt"), Err(TokenError::Invalid(_))));
    assert!(matches!(tokens.verify(""), Err(TokenError::Invalid(_))));
}

#[test]
fn test_expired_token_is_rejected() {
    let claims = Claims {
        sub: 7,
        role: Role::NormalUser,
        iat: now() - 7200,
        exp: Some(now() - 3600),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let tokens = TokenService::new(SECRET, None);
    assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
}

#[test]
fn test_token_with_ttl_is_valid_before_expiry() {
    let tokens = TokenService::new(SECRET, Some(3600));
    let token = tokens.issue(3, Role::NormalUser).unwrap();
    assert_eq!(tokens.verify(&token).unwrap().id, 3);
}

#[test]
fn test_token_without_exp_never_expires() {
    let claims = Claims {
        sub: 9,
        role: Role::NormalUser,
        iat: 1,
        exp: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let tokens = TokenService::new(SECRET, None);
    assert_eq!(tokens.verify(&token).unwrap().id, 9);
}

// --- Access Control Gate ---

#[test]
fn test_authorize_without_token_is_unauthenticated() {
    let tokens = TokenService::new(SECRET, None);
    let err = authorize(&tokens, &HeaderMap::new(), AdminOnly::ROLES).unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(ref m) if m == "No token provided"));
}

#[test]
fn test_authorize_with_non_bearer_scheme_is_unauthenticated() {
    let tokens = TokenService::new(SECRET, None);
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

    let err = authorize(&tokens, &headers, AnyRole::ROLES).unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(ref m) if m == "No token provided"));
}

#[test]
fn test_authorize_with_invalid_token_is_unauthenticated() {
    let tokens = TokenService::new(SECRET, None);
    let err = authorize(&tokens, &bearer_headers("garbage"), AnyRole::ROLES).unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(ref m) if m == "Invalid token"));
}

#[test]
fn test_authorize_with_wrong_role_is_forbidden() {
    let tokens = TokenService::new(SECRET, None);
    let token = tokens.issue(5, Role::NormalUser).unwrap();

    let err = authorize(&tokens, &bearer_headers(&token), AdminOnly::ROLES).unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(ref m) if m == "Insufficient permissions"));
    assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
}

#[test]
fn test_role_policies_match_their_allow_lists() {
    let tokens = TokenService::new(SECRET, None);
    let admin = bearer_headers(&tokens.issue(1, Role::SystemAdministrator).unwrap());
    let owner = bearer_headers(&tokens.issue(2, Role::StoreOwner).unwrap());
    let user = bearer_headers(&tokens.issue(3, Role::NormalUser).unwrap());

    assert!(authorize(&tokens, &admin, OwnerOrAdmin::ROLES).is_ok());
    assert!(authorize(&tokens, &owner, OwnerOrAdmin::ROLES).is_ok());
    assert!(authorize(&tokens, &user, OwnerOrAdmin::ROLES).is_err());

    assert!(authorize(&tokens, &owner, StoreOwnerOnly::ROLES).is_ok());
    assert!(authorize(&tokens, &admin, StoreOwnerOnly::ROLES).is_err());

    assert!(authorize(&tokens, &user, NormalUserOnly::ROLES).is_ok());
    assert!(authorize(&tokens, &owner, NormalUserOnly::ROLES).is_err());

    for headers in [&admin, &owner, &user] {
        assert!(authorize(&tokens, headers, AnyRole::ROLES).is_ok());
    }
}

// --- Optional identity ---

#[test]
fn test_identify_optional_never_fails() {
    let tokens = TokenService::new(SECRET, None);
    assert_eq!(identify_optional(&tokens, &HeaderMap::new()), None);
    assert_eq!(identify_optional(&tokens, &bearer_headers("garbage")), None);

    let token = tokens.issue(11, Role::NormalUser).unwrap();
    assert_eq!(
        identify_optional(&tokens, &bearer_headers(&token)),
        Some(AuthUser { id: 11, role: Role::NormalUser })
    );
}

// --- Extractors ---

#[tokio::test]
async fn test_auth_user_extractor_rejects_missing_token() {
    let state = test_state();
    let mut parts = parts_with_auth(None);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_user_extractor_prefers_gate_identity() {
    let state = test_state();
    let mut parts = parts_with_auth(None);
    let attached = AuthUser { id: 77, role: Role::SystemAdministrator };
    parts.extensions.insert(attached);

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user, attached);
}

#[tokio::test]
async fn test_auth_user_extractor_verifies_bearer_token() {
    let state = test_state();
    let token = state.tokens.issue(12, Role::StoreOwner).unwrap();
    let mut parts = parts_with_auth(Some(format!("Bearer {}", token).as_str()));

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, 12);
    assert_eq!(user.role, Role::StoreOwner);
}

#[tokio::test]
async fn test_maybe_auth_user_is_anonymous_on_bad_token() {
    let state = test_state();
    let mut parts = parts_with_auth(Some("Bearer definitely-not-valid"));

    let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_maybe_auth_user_resolves_valid_token() {
    let state = test_state();
    let token = state.tokens.issue(21, Role::NormalUser).unwrap();
    let mut parts = parts_with_auth(Some(format!("Bearer {}", token).as_str()));

    let caller = MaybeAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(caller.id(), Some(21));
}
