//! Analysis record decoded from a projected `onsale_email_analysis` row.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::postgres::PgRow;

use super::timezone::{localize, usable_zone};

/// One scored on-sale email.
///
/// Nullable columns stay `None`; they are never defaulted to zero or an
/// empty string. The two array columns decode NULL as an empty list.
/// Event, onsale and presale dates are expressed in their own zone columns
/// (see [`localize`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub email_id: String,
    pub email_subject: String,
    pub email_from: String,
    pub email_to: String,
    pub email_ts: Option<DateTime<Utc>>,
    pub analysis_generated_at: DateTime<Utc>,

    pub event_name: String,
    pub venue_name: Option<String>,
    pub venue_location: Option<String>,
    pub performer: Option<String>,
    pub event_type: Option<String>,
    pub event_url: Option<String>,
    pub event_date: Option<DateTime<FixedOffset>>,
    pub event_date_timezone: Option<String>,
    pub onsale_date: Option<DateTime<FixedOffset>>,
    pub onsale_date_timezone: Option<String>,
    pub presale_date: Option<DateTime<FixedOffset>>,
    pub presale_date_timezone: Option<String>,
    pub discount_code: Option<String>,

    pub opportunity_score: f64,
    pub confidence_percentage: Option<f64>,
    pub target_margin_percentage: Option<f64>,
    pub risk_factors: Vec<String>,
    pub opportunities: Vec<String>,
    pub reasoning_summary: Option<String>,
    pub historical_context: Option<String>,
    pub buying_guidance: Option<String>,
    pub risk_management: Option<String>,
    pub next_steps: Option<String>,

    pub market_volatility_level: Option<String>,
    pub demand_uncertainty_level: Option<String>,
    pub competition_level: Option<String>,
    pub recommended_buy_amount_min: Option<i64>,
    pub recommended_buy_amount_max: Option<i64>,
    pub target_resale_markup_percentage: Option<f64>,
    pub stop_loss_percentage: Option<f64>,

    pub buyability_score: Option<f64>,
    pub estimated_total_profit: Option<f64>,
    pub overall_opportunity_score: Option<i64>,
    pub additional_details: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AnalysisRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let event_date_timezone: Option<String> = row.try_get("event_date_timezone")?;
        let onsale_date_timezone: Option<String> = row.try_get("onsale_date_timezone")?;
        let presale_date_timezone: Option<String> = row.try_get("presale_date_timezone")?;
        let fallback = usable_zone(event_date_timezone.as_deref());

        let local = |column: &str, zone: &Option<String>| -> Result<_, sqlx::Error> {
            let instant: Option<DateTime<Utc>> = row.try_get(column)?;
            Ok(instant.map(|at| localize(at, zone.as_deref(), fallback)))
        };
        let event_date = local("event_date", &event_date_timezone)?;
        let onsale_date = local("onsale_date", &onsale_date_timezone)?;
        let presale_date = local("presale_date", &presale_date_timezone)?;

        Ok(Self {
            id: row.try_get("id")?,
            email_id: row.try_get("email_id")?,
            email_subject: row.try_get("email_subject")?,
            email_from: row.try_get("email_from")?,
            email_to: row.try_get("email_to")?,
            email_ts: row.try_get("email_ts")?,
            analysis_generated_at: row.try_get("analysis_generated_at")?,

            event_name: row.try_get("event_name")?,
            venue_name: row.try_get("venue_name")?,
            venue_location: row.try_get("venue_location")?,
            performer: row.try_get("performer")?,
            event_type: row.try_get("event_type")?,
            event_url: row.try_get("event_url")?,
            event_date,
            event_date_timezone,
            onsale_date,
            onsale_date_timezone,
            presale_date,
            presale_date_timezone,
            discount_code: row.try_get("discount_code")?,

            opportunity_score: row.try_get("opportunity_score")?,
            confidence_percentage: row.try_get("confidence_percentage")?,
            target_margin_percentage: row.try_get("target_margin_percentage")?,
            risk_factors: text_array(row, "risk_factors")?,
            opportunities: text_array(row, "opportunities")?,
            reasoning_summary: row.try_get("reasoning_summary")?,
            historical_context: row.try_get("historical_context")?,
            buying_guidance: row.try_get("buying_guidance")?,
            risk_management: row.try_get("risk_management")?,
            next_steps: row.try_get("next_steps")?,

            market_volatility_level: row.try_get("market_volatility_level")?,
            demand_uncertainty_level: row.try_get("demand_uncertainty_level")?,
            competition_level: row.try_get("competition_level")?,
            recommended_buy_amount_min: row.try_get("recommended_buy_amount_min")?,
            recommended_buy_amount_max: row.try_get("recommended_buy_amount_max")?,
            target_resale_markup_percentage: row.try_get("target_resale_markup_percentage")?,
            stop_loss_percentage: row.try_get("stop_loss_percentage")?,

            buyability_score: row.try_get("buyability_score")?,
            estimated_total_profit: row.try_get("estimated_total_profit")?,
            overall_opportunity_score: row.try_get("overall_opportunity_score")?,
            additional_details: row.try_get("additional_details")?,

            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// NULL text[] → empty list.
fn text_array(row: &PgRow, column: &str) -> Result<Vec<String>, sqlx::Error> {
    Ok(row
        .try_get::<Option<Vec<String>>, _>(column)?
        .unwrap_or_default())
}
