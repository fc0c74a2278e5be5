use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Argon2 work factor. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub cookie: CookieConfig,
    pub cors_origin: Option<String>,
    pub listen_addr: SocketAddr,
}

/// Upper bound on either token lifetime (one year).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be exercised
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let parsed = |key: &str| -> anyhow::Result<Option<i64>> {
            lookup(key)
                .map(|v| v.parse::<i64>().with_context(|| format!("{key} must be an integer")))
                .transpose()
        };
        let parsed_u32 = |key: &str, default: u32| -> anyhow::Result<u32> {
            lookup(key)
                .map(|v| v.parse::<u32>().with_context(|| format!("{key} must be a positive integer")))
                .transpose()
                .map(|v| v.unwrap_or(default))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_secret: required("REFRESH_TOKEN_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "spendwise".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "spendwise-users".into()),
            access_ttl_minutes: parsed("ACCESS_TOKEN_TTL_MINUTES")?.unwrap_or(2),
            refresh_ttl_minutes: parsed("REFRESH_TOKEN_TTL_MINUTES")?.unwrap_or(10),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parsed_u32("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parsed_u32("PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parsed_u32("PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };

        let cookie = CookieConfig {
            secure: lookup("COOKIE_SECURE")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        };

        let listen_addr = format!(
            "{}:{}",
            lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            lookup("APP_PORT").unwrap_or_else(|| "8080".into())
        )
        .parse()
        .context("APP_HOST/APP_PORT do not form a socket address")?;

        let config = Self {
            database_url,
            jwt,
            password,
            cookie,
            cors_origin: lookup("CORS_ORIGIN").filter(|v| !v.trim().is_empty()),
            listen_addr,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let jwt = &self.jwt;
        anyhow::ensure!(!jwt.access_secret.is_empty(), "ACCESS_TOKEN_SECRET must not be empty");
        anyhow::ensure!(!jwt.refresh_secret.is_empty(), "REFRESH_TOKEN_SECRET must not be empty");
        anyhow::ensure!(
            jwt.access_secret != jwt.refresh_secret,
            "access and refresh tokens must be signed with different secrets"
        );
        anyhow::ensure!(jwt.access_ttl_minutes > 0, "access token lifetime must be positive");
        anyhow::ensure!(
            jwt.refresh_ttl_minutes >= jwt.access_ttl_minutes,
            "refresh token lifetime must not be shorter than the access token lifetime"
        );
        anyhow::ensure!(
            jwt.refresh_ttl_minutes <= MAX_TTL_MINUTES,
            "token lifetimes must not exceed {MAX_TTL_MINUTES} minutes"
        );
        argon2::Params::new(
            self.password.memory_kib,
            self.password.iterations,
            self.password.parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("invalid password hashing parameters: {e}"))?;
        if let Some(origin) = &self.cors_origin {
            HeaderValue::from_str(origin).context("CORS_ORIGIN is not a valid header value")?;
        }
        Ok(())
    }
}
