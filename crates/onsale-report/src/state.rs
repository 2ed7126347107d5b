//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::auth::{IdentityVerifier, JwtVerifier};
use crate::config::Config;
use crate::db;
use crate::report::{PageLimits, ReportService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Report query execution.
    reports: ReportService,

    /// Bearer token verification.
    verifier: Arc<dyn IdentityVerifier>,

    /// Role every report caller must hold.
    required_role: String,

    /// Page size default and ceiling.
    page_limits: PageLimits,
}

impl AppState {
    /// Create new application state, connecting to PostgreSQL.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        info!(
            max_connections = config.database_max_connections,
            "PostgreSQL pool ready"
        );

        Ok(Self::from_parts(
            config,
            db,
            Arc::new(JwtVerifier::from_config(config)),
        ))
    }

    /// Assemble state from an existing pool and verifier.
    pub fn from_parts(config: &Config, db: PgPool, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let reports = ReportService::new(db.clone(), config.statement_timeout);
        Self {
            inner: Arc::new(AppStateInner {
                db,
                reports,
                verifier,
                required_role: config.required_role.clone(),
                page_limits: PageLimits {
                    default_page_size: config.default_page_size,
                    max_page_size: config.max_page_size,
                },
            }),
        }
    }

    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }

    pub fn verifier(&self) -> &dyn IdentityVerifier {
        self.inner.verifier.as_ref()
    }

    pub fn required_role(&self) -> &str {
        &self.inner.required_role
    }

    pub fn page_limits(&self) -> PageLimits {
        self.inner.page_limits
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
