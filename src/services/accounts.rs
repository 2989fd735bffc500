use crate::{
    auth::TokenService,
    config::BootstrapAdmin,
    error::ApiError,
    models::{
        CreateUserRequest, LoginRequest, NewUser, Role, SignupRequest, UpdatePasswordRequest, User,
        UserProfile,
    },
    repository::Repository,
    services::blocking,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    Ok(blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    Ok(blocking(move || bcrypt::verify(password, &hash)).await??)
}

/// signup
///
/// Self-registration. The role is always Normal User regardless of what the client
/// sends.
pub async fn signup(
    repo: &dyn Repository,
    bcrypt_cost: u32,
    req: SignupRequest,
) -> Result<User, ApiError> {
    let password_hash = hash_password(req.password, bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            address: req.address,
            role: Role::NormalUser,
        })
        .await?;

    tracing::info!(user_id = user.id, "user signed up");
    Ok(user)
}

/// login
///
/// Unknown email and wrong password answer the same way so the endpoint does not reveal
/// which accounts exist.
pub async fn login(
    repo: &dyn Repository,
    tokens: &TokenService,
    req: LoginRequest,
) -> Result<String, ApiError> {
    let Some(user) = repo.find_user_by_email(&req.email).await? else {
        tracing::debug!("login for unknown email");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(req.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = user.id, "login with wrong password");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    tokens.issue(user.id, user.role)
}

/// update_password
///
/// Requires the current password; the new one is re-hashed before it is stored.
pub async fn update_password(
    repo: &dyn Repository,
    bcrypt_cost: u32,
    user_id: i32,
    req: UpdatePasswordRequest,
) -> Result<(), ApiError> {
    let user = repo
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(req.current_password, user.password_hash).await? {
        return Err(ApiError::Unauthenticated(
            "Invalid current password".to_string(),
        ));
    }

    let password_hash = hash_password(req.new_password, bcrypt_cost).await?;
    if !repo.update_password(user_id, &password_hash).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id, "password updated");
    Ok(())
}

pub async fn profile(repo: &dyn Repository, user_id: i32) -> Result<UserProfile, ApiError> {
    repo.find_user(user_id)
        .await?
        .map(|user| user.profile())
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// create_user
///
/// Administrator-created account of any role. The request has already passed the 10-40
/// name rule and the role allow-list.
pub async fn create_user(
    repo: &dyn Repository,
    bcrypt_cost: u32,
    req: CreateUserRequest,
) -> Result<UserProfile, ApiError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::InvalidArgument("Invalid role".to_string()))?;

    let password_hash = hash_password(req.password, bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            address: req.address,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "admin created user");
    Ok(user.profile())
}

/// bootstrap_admin
///
/// Creates the configured System Administrator unless an account with that email already
/// exists. Returns whether a new account was created.
pub async fn bootstrap_admin(
    repo: &dyn Repository,
    bcrypt_cost: u32,
    admin: &BootstrapAdmin,
) -> Result<bool, ApiError> {
    if repo.find_user_by_email(&admin.email).await?.is_some() {
        tracing::debug!(email = %admin.email, "bootstrap admin already present");
        return Ok(false);
    }

    let password_hash = hash_password(admin.password.clone(), bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash,
            address: admin.address.clone(),
            role: Role::SystemAdministrator,
        })
        .await?;

    tracing::info!(user_id = user.id, "bootstrap administrator created");
    Ok(true)
}
