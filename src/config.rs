use std::env;

pub const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is immutable once
/// loaded and is pulled into handlers via FromRef as part of the shared `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. Only optional in local mode, where its absence selects
    // the in-memory repository.
    pub db_url: Option<String>,
    // Runtime environment marker.
    pub env: Env,
    // Secret used to sign and verify identity tokens.
    pub jwt_secret: String,
    // Token lifetime in seconds. `None` issues tokens without an `exp` claim.
    pub token_ttl_secs: Option<u64>,
    // TCP port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    // bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    // Optional administrator account created at startup if missing.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Env
///
/// Runtime context. Production demands every secret explicitly; local falls back to
/// development defaults.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// BootstrapAdmin
///
/// Credentials for the System Administrator seeded on first start.
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for tests. Uses the cheapest bcrypt cost so
    /// password round trips stay fast.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_secs: None,
            port: 5000,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables at startup and fails fast.
    ///
    /// # Panics
    /// Panics if a variable required for the current environment is missing or a numeric
    /// variable cannot be parsed. The server never starts with a half-valid
    /// configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
            ),
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let token_ttl_secs = env::var("TOKEN_TTL_SECS").ok().map(|v| {
            v.parse::<u64>()
                .expect("FATAL: TOKEN_TTL_SECS must be a whole number of seconds")
        });

        let port = env::var("PORT")
            .ok()
            .map(|v| v.parse::<u16>().expect("FATAL: PORT must be a valid port number"))
            .unwrap_or(5000);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .map(|v| v.parse::<u32>().expect("FATAL: BCRYPT_COST must be a number"))
            .unwrap_or(10);

        let bootstrap_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string()),
                email,
                password,
                address: env::var("ADMIN_ADDRESS").unwrap_or_else(|_| "Admin Address".to_string()),
            }),
            _ => None,
        };

        Self {
            db_url,
            env,
            jwt_secret,
            token_ttl_secs,
            port,
            bcrypt_cost,
            bootstrap_admin,
        }
    }
}
