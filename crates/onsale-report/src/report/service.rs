//! Report service for executing analysis queries.
//!
//! Every operation runs inside one transaction on one pooled connection
//! with a transaction-local statement timeout. Dropping the transaction
//! (error or cancellation) rolls back and returns the connection.

use std::time::Duration;

use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};

use super::binder::bind_values;
use super::query_builder::{AnalysisQueryBuilder, BuiltQuery, GroupField, LevelField};
use super::record::AnalysisRecord;
use super::types::{
    AnalysisFilter, AnalysisPage, AnalysisSummary, DistinctField, FilterOptions, GroupScore,
    LevelCount, NamedCount, OpportunityBands, PageRequest,
};
use crate::auth::AuthorizedContext;
use crate::error::{AppError, AppResult};

/// Aggregate row produced by `build_stats`.
#[derive(sqlx::FromRow)]
struct StatsRow {
    total_count: i64,
    avg_score: Option<f64>,
    min_score: Option<f64>,
    max_score: Option<f64>,
    high: i64,
    medium: i64,
    low: i64,
    hot: i64,
    great: i64,
    good: i64,
    pass: i64,
}

/// Service for read-only analysis reports.
#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
    statement_timeout: Duration,
}

impl ReportService {
    /// Create a new ReportService.
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Same pool, different per-statement bound.
    pub fn with_statement_timeout(&self, statement_timeout: Duration) -> Self {
        Self {
            pool: self.pool.clone(),
            statement_timeout,
        }
    }

    /// One page of matching analyses plus the total match count.
    ///
    /// An offset at or past the total yields an empty page with the true
    /// total, not an error.
    pub async fn list_analyses(
        &self,
        ctx: &AuthorizedContext,
        filter: &AnalysisFilter,
        page: PageRequest,
    ) -> AppResult<AnalysisPage> {
        let builder = AnalysisQueryBuilder::new(filter);
        let mut tx = self.begin().await?;

        let total = fetch_count(&mut tx, &builder.build_count()).await?;
        let items = fetch_records(
            &mut tx,
            &builder.build_page(u64::from(page.page_size()), page.offset()),
        )
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user = %ctx.subject,
            predicates = builder.predicates().len(),
            page = page.page(),
            page_size = page.page_size(),
            total = total,
            "listed analyses"
        );

        Ok(AnalysisPage::new(items, total, &page))
    }

    /// Dashboard statistics over the filtered set.
    pub async fn get_summary(
        &self,
        ctx: &AuthorizedContext,
        filter: &AnalysisFilter,
    ) -> AppResult<AnalysisSummary> {
        let builder = AnalysisQueryBuilder::new(filter);
        let mut tx = self.begin().await?;

        let stats: StatsRow = fetch_one_as(&mut tx, &builder.build_stats()).await?;

        let market_volatility_breakdown: Vec<LevelCount> = fetch_all_as(
            &mut tx,
            &builder.build_level_breakdown(LevelField::MarketVolatility),
        )
        .await?;
        let demand_uncertainty_breakdown: Vec<LevelCount> = fetch_all_as(
            &mut tx,
            &builder.build_level_breakdown(LevelField::DemandUncertainty),
        )
        .await?;
        let competition_breakdown: Vec<LevelCount> = fetch_all_as(
            &mut tx,
            &builder.build_level_breakdown(LevelField::Competition),
        )
        .await?;

        let top_performers: Vec<GroupScore> =
            fetch_all_as(&mut tx, &builder.build_top_groups(GroupField::Performer)).await?;
        let top_venues: Vec<GroupScore> =
            fetch_all_as(&mut tx, &builder.build_top_groups(GroupField::Venue)).await?;
        let event_type_distribution: Vec<NamedCount> =
            fetch_all_as(&mut tx, &builder.build_distribution()).await?;

        let recent_analyses = fetch_records(&mut tx, &builder.build_recent()).await?;

        tx.commit().await?;

        let total_count = u64::try_from(stats.total_count).unwrap_or_default();

        tracing::debug!(
            user = %ctx.subject,
            predicates = builder.predicates().len(),
            total = total_count,
            "built analysis summary"
        );

        Ok(AnalysisSummary {
            total_count,
            average_opportunity_score: stats.avg_score.unwrap_or(0.0),
            min_opportunity_score: stats.min_score,
            max_opportunity_score: stats.max_score,
            bands: OpportunityBands {
                high: stats.high,
                medium: stats.medium,
                low: stats.low,
                hot: stats.hot,
                great: stats.great,
                good: stats.good,
                pass: stats.pass,
            },
            market_volatility_breakdown,
            demand_uncertainty_breakdown,
            competition_breakdown,
            top_performers,
            top_venues,
            event_type_distribution,
            recent_analyses,
        })
    }

    /// Distinct values of one field over the filtered set.
    pub async fn distinct_values(
        &self,
        ctx: &AuthorizedContext,
        field: DistinctField,
        filter: &AnalysisFilter,
    ) -> AppResult<FilterOptions> {
        let built = AnalysisQueryBuilder::new(filter).build_distinct(field);
        let mut tx = self.begin().await?;

        let args = bind_values(&built.values)?;
        let values: Vec<String> = sqlx::query_scalar_with(&built.sql, args)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| query_failed("distinct_values", &built, e))?;

        tx.commit().await?;

        let options = FilterOptions::from_values(values);
        tracing::debug!(
            user = %ctx.subject,
            field = ?field,
            total = options.total,
            "listed filter options"
        );
        Ok(options)
    }

    /// Single record by exact id.
    pub async fn get_analysis(
        &self,
        ctx: &AuthorizedContext,
        id: &str,
    ) -> AppResult<Option<AnalysisRecord>> {
        let built = AnalysisQueryBuilder::build_by_id(id);
        let mut tx = self.begin().await?;

        let args = bind_values(&built.values)?;
        let record: Option<AnalysisRecord> = sqlx::query_as_with(&built.sql, args)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| query_failed("get_analysis", &built, e))?;

        tx.commit().await?;

        tracing::debug!(user = %ctx.subject, found = record.is_some(), "fetched analysis");
        Ok(record)
    }

    /// Open a transaction with the statement timeout applied locally.
    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;

        // set_config(..., true) is transaction-local and resets on commit/rollback.
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(format!("{}ms", self.statement_timeout.as_millis().max(1)))
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }
}

async fn fetch_count(conn: &mut PgConnection, built: &BuiltQuery) -> AppResult<u64> {
    let args = bind_values(&built.values)?;
    let total: i64 = sqlx::query_scalar_with(&built.sql, args)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| query_failed("count", built, e))?;
    Ok(u64::try_from(total).unwrap_or_default())
}

async fn fetch_records(conn: &mut PgConnection, built: &BuiltQuery) -> AppResult<Vec<AnalysisRecord>> {
    fetch_all_as(conn, built).await
}

async fn fetch_one_as<T>(conn: &mut PgConnection, built: &BuiltQuery) -> AppResult<T>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let args = bind_values(&built.values)?;
    sqlx::query_as_with(&built.sql, args)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| query_failed("fetch_one", built, e))
}

async fn fetch_all_as<T>(conn: &mut PgConnection, built: &BuiltQuery) -> AppResult<Vec<T>>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let args = bind_values(&built.values)?;
    sqlx::query_as_with(&built.sql, args)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| query_failed("fetch_all", built, e))
}

/// Classify a query failure, logging the statement shape (never its values).
fn query_failed(operation: &'static str, built: &BuiltQuery, err: sqlx::Error) -> AppError {
    let err = AppError::from(err);
    match &err {
        AppError::Timeout => {
            tracing::warn!(operation, query = %built.sql, "report query timed out");
        }
        AppError::Decode(detail) => {
            tracing::error!(operation, query = %built.sql, detail = %detail, "report row decode failed");
        }
        other => {
            tracing::error!(operation, query = %built.sql, error = %other, "report query failed");
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::PageLimits;

    fn assert_send<T: Send>(_: &T) {}

    fn context() -> AuthorizedContext {
        AuthorizedContext {
            subject: "analyst-1".to_string(),
            email: None,
            roles: vec!["user".to_string()],
        }
    }

    // Handlers hold these futures across awaits; axum needs them Send.
    #[tokio::test]
    async fn operation_futures_are_send() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let service = ReportService::new(pool, Duration::from_secs(1));
        let ctx = context();
        let filter = AnalysisFilter {
            venues: vec!["Garden".to_string()],
            ..Default::default()
        };
        let page = PageRequest::resolve(None, None, PageLimits::default()).unwrap();

        assert_send(&service.list_analyses(&ctx, &filter, page));
        assert_send(&service.get_summary(&ctx, &filter));
        assert_send(&service.distinct_values(&ctx, DistinctField::Venue, &filter));
        assert_send(&service.get_analysis(&ctx, "abc"));
    }

    #[tokio::test]
    async fn statement_timeout_override_keeps_pool() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let service = ReportService::new(pool, Duration::from_secs(10));
        let short = service.with_statement_timeout(Duration::from_millis(5));

        assert_eq!(short.statement_timeout, Duration::from_millis(5));
        assert_eq!(service.statement_timeout, Duration::from_secs(10));
    }
}
