use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use mp_common::{env_flag, env_number, Secret};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::ServerError;

const DEFAULT_MP_HOST: &str = "127.0.0.1";
const DEFAULT_MP_PORT: u16 = 8080;
const DEFAULT_MP_DATABASE_URL: &str = "sqlite://data/marketplace.db?mode=rwc";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const RANDOM_SECRET_LENGTH: usize = 48;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    /// Every call gets a deadline this far in the future. Storage work still running when it passes is rolled back.
    pub request_timeout: StdDuration,
    /// If true, the embedded database migrations are not applied on start-up.
    pub skip_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MP_HOST.to_string(),
            port: DEFAULT_MP_PORT,
            database_url: DEFAULT_MP_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            request_timeout: StdDuration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            skip_migrations: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MP_HOST").ok().unwrap_or_else(|| DEFAULT_MP_HOST.into());
        let port = env_number("MP_PORT", DEFAULT_MP_PORT);
        let database_url = env::var("MP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MP_DATABASE_URL is not set. Using the default, {DEFAULT_MP_DATABASE_URL}.");
            DEFAULT_MP_DATABASE_URL.to_string()
        });
        let db_max_connections = env_number("MP_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let request_timeout = StdDuration::from_secs(env_number("MP_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        let skip_migrations = env_flag("MP_SKIP_MIGRATIONS", false);
        Self { host, port, database_url, db_max_connections, auth, request_timeout, skip_migrations }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    /// How long an issued access token stays valid.
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. Every token issued \
             by this process becomes invalid when it stops. DO NOT operate on production like this. Set MP_JWT_SECRET \
             instead. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(RANDOM_SECRET_LENGTH).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret), token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS) }
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: &str, token_ttl: Duration) -> Self {
        Self { jwt_secret: Secret::from(jwt_secret), token_ttl }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("MP_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [MP_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("MP_JWT_SECRET is empty".to_string()));
        }
        let hours = env_number("MP_JWT_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS);
        if hours <= 0 {
            return Err(ServerError::ConfigurationError(format!(
                "MP_JWT_TOKEN_TTL_HOURS must be positive, but was {hours}"
            )));
        }
        Ok(Self { jwt_secret: Secret::new(secret), token_ttl: Duration::hours(hours) })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. Contains no secrets.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub request_timeout: StdDuration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { request_timeout: config.request_timeout }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { request_timeout: StdDuration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS) }
    }
}
