//! OnSale report test utilities.
//!
//! Helpers for integration testing: the analysis table schema, a record
//! fixture builder, token claims, and JSON assertion utilities.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// DDL for the analysis table, matching the production column types.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS onsale_email_analysis (
    id TEXT PRIMARY KEY,
    email_id TEXT NOT NULL,
    email_subject TEXT NOT NULL,
    email_from TEXT NOT NULL,
    email_to TEXT NOT NULL,
    email_ts TIMESTAMPTZ,
    analysis_generated_at TIMESTAMPTZ NOT NULL,
    event_name TEXT NOT NULL,
    venue_name TEXT,
    venue_location TEXT,
    performer TEXT,
    event_type TEXT,
    event_url TEXT,
    event_date TIMESTAMPTZ,
    event_date_timezone TEXT,
    onsale_date TIMESTAMPTZ,
    onsale_date_timezone TEXT,
    presale_date TIMESTAMPTZ,
    presale_date_timezone TEXT,
    discount_code TEXT,
    opportunity_score NUMERIC(5, 2) NOT NULL,
    confidence_percentage NUMERIC(5, 2),
    target_margin_percentage NUMERIC(5, 2),
    risk_factors TEXT[],
    opportunities TEXT[],
    reasoning_summary TEXT,
    historical_context TEXT,
    buying_guidance TEXT,
    risk_management TEXT,
    next_steps TEXT,
    market_volatility_level TEXT,
    demand_uncertainty_level TEXT,
    competition_level TEXT,
    recommended_buy_amount_min INTEGER,
    recommended_buy_amount_max INTEGER,
    target_resale_markup_percentage NUMERIC(6, 2),
    stop_loss_percentage NUMERIC(5, 2),
    buyability_score NUMERIC(5, 2),
    estimated_total_profit NUMERIC(12, 2),
    overall_opportunity_score INTEGER,
    additional_details JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Fixed reference instant so fixtures are reproducible.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Create a test analysis with default values.
pub fn test_analysis(event_name: &str, opportunity_score: f64) -> TestAnalysis {
    let id = Uuid::now_v7().to_string();
    TestAnalysis {
        email_id: format!("email-{id}"),
        id,
        event_name: event_name.to_string(),
        opportunity_score,
        analysis_generated_at: base_time(),
        venue_name: None,
        performer: None,
        event_type: None,
        event_date: None,
        event_date_timezone: None,
        onsale_date: None,
        onsale_date_timezone: None,
        confidence_percentage: None,
        market_volatility_level: None,
        demand_uncertainty_level: None,
        competition_level: None,
        risk_factors: Some(Vec::new()),
        opportunities: Some(Vec::new()),
        overall_opportunity_score: None,
        estimated_total_profit: None,
        buyability_score: None,
        additional_details: None,
    }
}

/// An analysis record builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestAnalysis {
    pub id: String,
    pub email_id: String,
    pub event_name: String,
    pub opportunity_score: f64,
    pub analysis_generated_at: DateTime<Utc>,
    pub venue_name: Option<String>,
    pub performer: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_date_timezone: Option<String>,
    pub onsale_date: Option<DateTime<Utc>>,
    pub onsale_date_timezone: Option<String>,
    pub confidence_percentage: Option<f64>,
    pub market_volatility_level: Option<String>,
    pub demand_uncertainty_level: Option<String>,
    pub competition_level: Option<String>,
    pub risk_factors: Option<Vec<String>>,
    pub opportunities: Option<Vec<String>>,
    pub overall_opportunity_score: Option<i32>,
    pub estimated_total_profit: Option<f64>,
    pub buyability_score: Option<f64>,
    pub additional_details: Option<JsonValue>,
}

impl TestAnalysis {
    /// Set a custom ID.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_venue(mut self, venue: &str) -> Self {
        self.venue_name = Some(venue.to_string());
        self
    }

    pub fn with_performer(mut self, performer: &str) -> Self {
        self.performer = Some(performer.to_string());
        self
    }

    pub fn with_event_type(mut self, event_type: &str) -> Self {
        self.event_type = Some(event_type.to_string());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_percentage = Some(confidence);
        self
    }

    /// Generated `offset` after [`base_time`].
    pub fn generated_after(mut self, offset: Duration) -> Self {
        self.analysis_generated_at = base_time() + offset;
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.analysis_generated_at = at;
        self
    }

    pub fn with_event_date(mut self, at: DateTime<Utc>) -> Self {
        self.event_date = Some(at);
        self
    }

    pub fn with_onsale_date(mut self, at: DateTime<Utc>) -> Self {
        self.onsale_date = Some(at);
        self
    }

    /// Set the event and onsale zone columns as stored (placeholders included).
    pub fn with_timezones(mut self, event: &str, onsale: &str) -> Self {
        self.event_date_timezone = Some(event.to_string());
        self.onsale_date_timezone = Some(onsale.to_string());
        self
    }

    /// Set market volatility, demand uncertainty and competition levels.
    pub fn with_levels(mut self, volatility: &str, demand: &str, competition: &str) -> Self {
        self.market_volatility_level = Some(volatility.to_string());
        self.demand_uncertainty_level = Some(demand.to_string());
        self.competition_level = Some(competition.to_string());
        self
    }

    pub fn with_risk_factors(mut self, factors: &[&str]) -> Self {
        self.risk_factors = Some(factors.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Store NULL in both array columns.
    pub fn with_null_arrays(mut self) -> Self {
        self.risk_factors = None;
        self.opportunities = None;
        self
    }

    pub fn with_overall_opportunity(mut self, score: i32) -> Self {
        self.overall_opportunity_score = Some(score);
        self
    }

    pub fn with_estimated_profit(mut self, profit: f64) -> Self {
        self.estimated_total_profit = Some(profit);
        self
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.additional_details = Some(details);
        self
    }

    /// Insert into `onsale_email_analysis` on the given pool.
    pub async fn insert(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO onsale_email_analysis (
                id, email_id, email_subject, email_from, email_to, email_ts,
                analysis_generated_at, event_name, venue_name, performer, event_type,
                event_date, opportunity_score, confidence_percentage,
                market_volatility_level, demand_uncertainty_level, competition_level,
                risk_factors, opportunities, overall_opportunity_score,
                estimated_total_profit, buyability_score, additional_details,
                event_date_timezone, onsale_date, onsale_date_timezone
            )
            VALUES (
                $1, $2, $3, 'alerts@tickets.example.com', 'inbox@example.com', $4,
                $4, $5, $6, $7, $8,
                $9, $10::float8, $11::float8,
                $12, $13, $14,
                $15, $16, $17,
                $18::float8, $19::float8, $20,
                $21, $22, $23
            )
            "#,
        )
        .bind(&self.id)
        .bind(&self.email_id)
        .bind(format!("On sale soon: {}", self.event_name))
        .bind(self.analysis_generated_at)
        .bind(&self.event_name)
        .bind(&self.venue_name)
        .bind(&self.performer)
        .bind(&self.event_type)
        .bind(self.event_date)
        .bind(self.opportunity_score)
        .bind(self.confidence_percentage)
        .bind(&self.market_volatility_level)
        .bind(&self.demand_uncertainty_level)
        .bind(&self.competition_level)
        .bind(&self.risk_factors)
        .bind(&self.opportunities)
        .bind(self.overall_opportunity_score)
        .bind(self.estimated_total_profit)
        .bind(self.buyability_score)
        .bind(&self.additional_details)
        .bind(&self.event_date_timezone)
        .bind(self.onsale_date)
        .bind(&self.onsale_date_timezone)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Insert every fixture in order.
pub async fn insert_all(pool: &PgPool, fixtures: &[TestAnalysis]) -> Result<(), sqlx::Error> {
    for fixture in fixtures {
        fixture.insert(pool).await?;
    }
    Ok(())
}

/// Insert `count` generated rows in one statement, for volume tests.
pub async fn insert_bulk(pool: &PgPool, count: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO onsale_email_analysis (
            id, email_id, email_subject, email_from, email_to,
            analysis_generated_at, event_name, venue_name, performer,
            opportunity_score, competition_level
        )
        SELECT
            'bulk-' || g, 'email-' || g, 'Bulk ' || g, 'alerts@tickets.example.com', 'inbox@example.com',
            $1 - g * INTERVAL '1 second', 'Bulk Event ' || g, 'Venue ' || (g % 500), 'Performer ' || (g % 900),
            (g % 100)::numeric, (ARRAY['low', 'medium', 'high'])[(1 + g % 3)::int]
        FROM generate_series(1, $2) AS g
        "#,
    )
    .bind(base_time())
    .bind(count)
    .execute(pool)
    .await?;
    Ok(())
}

/// JWT claims for a test caller with the given roles, valid for an hour.
pub fn test_claims(subject: &str, roles: &[&str]) -> JsonValue {
    serde_json::json!({
        "sub": subject,
        "email": format!("{subject}@example.com"),
        "roles": roles,
        "exp": Utc::now().timestamp() + 3600,
    })
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that `value[key]` is an array of `len` elements.
    pub fn array_len(value: &Value, key: &str, len: usize) {
        let actual = value.get(key).and_then(Value::as_array).map(Vec::len);
        assert_eq!(
            actual,
            Some(len),
            "Expected '{key}' to be an array of {len}, got: {value}"
        );
    }

    /// Assert that an error body carries a message.
    pub fn error_body(value: &Value) {
        assert!(
            value.get("error").and_then(Value::as_str).is_some(),
            "Expected an error body, got: {value}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_defaults() {
        let a = test_analysis("Tour Opener", 82.5);
        assert_eq!(a.event_name, "Tour Opener");
        assert_eq!(a.analysis_generated_at, base_time());
        assert_eq!(a.risk_factors, Some(Vec::new()));
        assert!(a.venue_name.is_none());
    }

    #[test]
    fn builder_chain() {
        let a = test_analysis("Arena Night", 60.0)
            .with_venue("Madison Square Garden")
            .with_timezones("America/Chicago", "unknown")
            .with_levels("high", "low", "medium")
            .with_null_arrays();
        assert_eq!(a.venue_name.as_deref(), Some("Madison Square Garden"));
        assert_eq!(a.competition_level.as_deref(), Some("medium"));
        assert!(a.risk_factors.is_none());
        assert_eq!(a.onsale_date_timezone.as_deref(), Some("unknown"));
    }

    #[test]
    fn unique_ids() {
        assert_ne!(test_analysis("a", 1.0).id, test_analysis("a", 1.0).id);
    }
}
