//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// How long a request waits for a pooled connection (default: 5s).
    pub database_acquire_timeout: Duration,

    /// Per-statement timeout applied inside every report transaction (default: 10s).
    pub statement_timeout: Duration,

    /// Whole-request timeout enforced by the HTTP layer (default: 30s).
    pub request_timeout: Duration,

    /// Page size used when the caller does not supply one (default: 20).
    pub default_page_size: u32,

    /// Ceiling that larger page sizes are clamped to (default: 100).
    pub max_page_size: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,

    /// Expected `iss` claim, if any.
    pub jwt_issuer: Option<String>,

    /// Expected `aud` claim, if any.
    pub jwt_audience: Option<String>,

    /// Role a caller must hold to use the report endpoints (default: "user").
    pub required_role: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let database_acquire_timeout = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be a valid u64")?;

        let statement_timeout = lookup("STATEMENT_TIMEOUT_MS")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .map(Duration::from_millis)
            .context("STATEMENT_TIMEOUT_MS must be a valid u64")?;

        if statement_timeout.is_zero() {
            // Postgres reads 0 as "no timeout".
            bail!("STATEMENT_TIMEOUT_MS must be at least 1");
        }

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("REQUEST_TIMEOUT_SECS must be a valid u64")?;

        let default_page_size: u32 = lookup("DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|| "20".to_string())
            .parse()
            .context("DEFAULT_PAGE_SIZE must be a valid u32")?;

        let max_page_size: u32 = lookup("MAX_PAGE_SIZE")
            .unwrap_or_else(|| "100".to_string())
            .parse()
            .context("MAX_PAGE_SIZE must be a valid u32")?;

        if default_page_size == 0 {
            bail!("DEFAULT_PAGE_SIZE must be at least 1");
        }
        if max_page_size < default_page_size {
            bail!(
                "MAX_PAGE_SIZE ({max_page_size}) must not be smaller than DEFAULT_PAGE_SIZE ({default_page_size})"
            );
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let jwt_secret = match (lookup("AUTH_JWT_SECRET"), lookup("AUTH_JWT_SECRET_FILE")) {
            (Some(secret), _) => secret,
            (None, Some(path)) => read_secret(PathBuf::from(path))?,
            (None, None) => {
                bail!("AUTH_JWT_SECRET or AUTH_JWT_SECRET_FILE environment variable is required")
            }
        };
        if jwt_secret.trim().is_empty() {
            bail!("AUTH_JWT_SECRET must not be empty");
        }

        let jwt_issuer = lookup("AUTH_JWT_ISSUER").filter(|s| !s.trim().is_empty());
        let jwt_audience = lookup("AUTH_JWT_AUDIENCE").filter(|s| !s.trim().is_empty());

        let required_role = lookup("REQUIRED_ROLE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "user".to_string());

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            database_acquire_timeout,
            statement_timeout,
            request_timeout,
            default_page_size,
            max_page_size,
            cors_allowed_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            required_role,
        })
    }
}

/// Read a secret mounted as a file (container secrets), trimming whitespace.
fn read_secret(path: PathBuf) -> Result<String> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read secret file {}", path.display()))?;
    Ok(contents.trim().to_string())
}
