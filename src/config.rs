use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Token and session cookie settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: 168,
            cookie_name: "session".to_string(),
            cookie_secure: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `memory://` runs against the in-process store.
    pub mongodb_uri: String,
    pub database_name: String,
    pub auth: AuthConfig,
    pub cors_origin: String,
    pub seed_demo_data: bool,
    pub force_seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: "bus_ticketing".to_string(),
            auth: AuthConfig::default(),
            cors_origin: "http://localhost:3000".to_string(),
            seed_demo_data: false,
            force_seed: false,
        }
    }
}

impl Config {
    /// Reads the environment (after `.env` has been loaded), falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let auth_defaults = defaults.auth;

        let jwt_secret = string_or("JWT_SECRET", &auth_defaults.jwt_secret);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT_SECRET is not set; tokens are signed with an insecure default");
        }

        Ok(Self {
            host: string_or("HOST", &defaults.host),
            port: parse_or("PORT", defaults.port)?,
            mongodb_uri: string_or("MONGODB_URI", &defaults.mongodb_uri),
            database_name: string_or("DATABASE_NAME", &defaults.database_name),
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours: parse_or("JWT_EXPIRY_HOURS", auth_defaults.token_ttl_hours)?,
                cookie_name: string_or("SESSION_COOKIE_NAME", &auth_defaults.cookie_name),
                cookie_secure: parse_or("COOKIE_SECURE", auth_defaults.cookie_secure)?,
                bcrypt_cost: parse_or("BCRYPT_COST", auth_defaults.bcrypt_cost)?,
            },
            cors_origin: string_or("CORS_ORIGIN", &defaults.cors_origin),
            seed_demo_data: parse_or("SEED_DEMO_DATA", defaults.seed_demo_data)?,
            force_seed: parse_or("FORCE_SEED", defaults.force_seed)?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.mongodb_uri.starts_with("memory://")
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn string_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default");
        default.to_string()
    })
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("'{raw}': {e}"),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
