use std::{
    convert::Infallible,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError, models::Role};

/// Claims
///
/// Payload of an identity token. Signed with the server secret (HS256), so any change to
/// `sub` or `role` invalidates the signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: i32,
    /// The role at the time the token was issued.
    pub role: Role,
    /// Issued At (iat).
    pub iat: u64,
    /// Expiration Time (exp). Only present when a token TTL is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// AuthUser
///
/// The resolved identity of a request: who is calling and with which role. Handlers
/// receive it either from the role gate (request extensions) or by verifying the bearer
/// token themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

/// TokenError
///
/// Why a token was rejected. Only logged; callers always see `Unauthenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid(String),
}

/// TokenService
///
/// Issues and verifies signed identity tokens. Pure: the output depends only on the
/// secret, the payload and (for expiry) the clock.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: Option<u64>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: Option<u64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is optional: tokens issued without a TTL never expire, tokens issued with
        // one are still checked against it.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    /// issue
    ///
    /// Produces a token binding `user_id` and `role`.
    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, ApiError> {
        let iat = now_secs();
        let claims = Claims {
            sub: user_id,
            role,
            iat,
            exp: self.ttl_secs.map(|ttl| iat + ttl),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// verify
    ///
    /// Decodes and checks the signature (and `exp`, when present).
    pub fn verify(&self, token: &str) -> Result<AuthUser, TokenError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(AuthUser {
                id: data.claims.sub,
                role: data.claims.role,
            }),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid(e.to_string())),
            },
        }
    }
}

impl FromRef<crate::AppState> for TokenService {
    fn from_ref(state: &crate::AppState) -> TokenService {
        state.tokens.clone()
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// authorize
///
/// The access-control decision for one request:
/// - no token: `Unauthenticated`
/// - token present but invalid or expired: `Unauthenticated`
/// - valid token whose role is not in `required`: `Forbidden`
/// - otherwise the decoded identity.
pub fn authorize(
    tokens: &TokenService,
    headers: &HeaderMap,
    required: &[Role],
) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthenticated("No token provided".to_string()))?;

    let user = tokens.verify(token).map_err(|e| {
        tracing::debug!(reason = ?e, "rejected bearer token");
        ApiError::Unauthenticated("Invalid token".to_string())
    })?;

    if !required.contains(&user.role) {
        tracing::warn!(user_id = user.id, role = %user.role, "role not permitted for route");
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(user)
}

/// identify_optional
///
/// The weaker, never-failing mode used by public reads: a valid token yields the
/// caller's identity, anything else (absent, malformed, expired) yields anonymous.
pub fn identify_optional(tokens: &TokenService, headers: &HeaderMap) -> Option<AuthUser> {
    let token = bearer_token(headers)?;
    match tokens.verify(token) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(reason = ?e, "ignoring unusable token on public route");
            None
        }
    }
}

// --- Role policies ---

/// RolePolicy
///
/// A named allow-list of roles. Routes are gated by picking a policy type, so the set of
/// permitted roles is visible at the routing site.
pub trait RolePolicy: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

pub struct AdminOnly;
pub struct NormalUserOnly;
pub struct StoreOwnerOnly;
pub struct OwnerOrAdmin;
/// Any authenticated caller.
pub struct AnyRole;

impl RolePolicy for AdminOnly {
    const ROLES: &'static [Role] = &[Role::SystemAdministrator];
}

impl RolePolicy for NormalUserOnly {
    const ROLES: &'static [Role] = &[Role::NormalUser];
}

impl RolePolicy for StoreOwnerOnly {
    const ROLES: &'static [Role] = &[Role::StoreOwner];
}

impl RolePolicy for OwnerOrAdmin {
    const ROLES: &'static [Role] = &[Role::StoreOwner, Role::SystemAdministrator];
}

impl RolePolicy for AnyRole {
    const ROLES: &'static [Role] = &Role::ALL;
}

/// require
///
/// Route-layer middleware enforcing policy `P`. On success the identity is attached to
/// the request extensions for the handler's `AuthUser` extractor.
pub async fn require<P: RolePolicy>(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authorize(&tokens, request.headers(), P::ROLES)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// AuthUser Extractor Implementation
///
/// Uses the identity attached by `require` when present. On routes without a gate it
/// falls back to verifying the bearer token for any role.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }
        let tokens = TokenService::from_ref(state);
        authorize(&tokens, &parts.headers, AnyRole::ROLES)
    }
}

/// MaybeAuthUser
///
/// Extractor form of `identify_optional`. Never rejects.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<i32> {
        self.0.map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        Ok(MaybeAuthUser(identify_optional(&tokens, &parts.headers)))
    }
}
