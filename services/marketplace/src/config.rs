use std::str::FromStr;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use skillify_common::{DatabaseConfig, JwtConfig, ServerConfig};

const DEV_JWT_SECRET: &str = "dev-secret-key-change-in-production";
/// Ten years; keeps token expiry arithmetic well inside chrono's range.
const MAX_JWT_EXPIRATION_HOURS: u64 = 24 * 365 * 10;

/// Parses `key` into its target type, so out-of-range values fail instead of wrapping.
fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number in range, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub environment: String,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let environment = get("ENVIRONMENT", "development");
        let is_production = environment == "production";

        let port = match var("SERVER_PORT").or_else(|| var("PORT")) {
            Some(port) => port.parse().context("SERVER_PORT must be a port number")?,
            None => 5000,
        };

        let mut cors_origins: Vec<String> = get("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(frontend) = var("FRONTEND_URL").filter(|s| !s.is_empty()) {
            if !cors_origins.contains(&frontend) {
                cors_origins.push(frontend);
            }
        }

        let expiration_hours: u64 = parse_var(&var, "JWT_EXPIRATION_HOURS", 168)?;
        if expiration_hours == 0 || expiration_hours > MAX_JWT_EXPIRATION_HOURS {
            bail!(
                "JWT_EXPIRATION_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRATION_HOURS
            );
        }

        let secret = match var("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if is_production => bail!("JWT_SECRET must be set in production"),
            None => DEV_JWT_SECRET.to_string(),
        };

        Ok(Self {
            server: ServerConfig {
                host: get("SERVER_HOST", "0.0.0.0"),
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL").filter(|s| !s.is_empty()),
                host: get("DATABASE_HOST", "localhost"),
                port: parse_var(&var, "DATABASE_PORT", 5432u16)?,
                username: get("DATABASE_USERNAME", "skillify"),
                password: get("DATABASE_PASSWORD", "skillify"),
                database: get("DATABASE_NAME", "skillify"),
                max_connections: parse_var(&var, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            jwt: JwtConfig {
                secret,
                expiration_hours,
                issuer: get("JWT_ISSUER", "skillify"),
            },
            environment,
            bcrypt_cost: parse_var(&var, "BCRYPT_COST", 10u32)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Cookie lifetime matches the token lifetime.
    pub fn cookie_max_age_secs(&self) -> u64 {
        self.jwt.expiration_hours * 3600
    }
}
