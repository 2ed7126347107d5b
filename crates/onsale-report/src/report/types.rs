//! Report query types.
//!
//! Provides type definitions for the filtered pagination engine:
//! - AnalysisFilter: optional predicates for one request
//! - PageRequest: validated, clamped pagination
//! - SortSpec: primary sort selection (tie-breaks are fixed)
//! - AnalysisPage / AnalysisSummary / FilterOptions: response shapes

use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::record::AnalysisRecord;
use crate::error::{AppError, AppResult};

// -------------------------------------------------------------------------
// Filter specification
// -------------------------------------------------------------------------

/// Inclusive calendar-date range, interpreted in UTC.
///
/// `end` covers the whole day: a record generated at 23:59 on the end date
/// is inside the range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// Create a range, rejecting a start that falls after the end.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AppResult<Self> {
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return Err(AppError::validation(format!(
                "date range start {s} is after end {e}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    /// Inclusive lower bound: midnight UTC on the start date.
    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        self.start
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Exclusive upper bound: midnight UTC on the day after the end date.
    pub fn upper_bound_exclusive(&self) -> Option<DateTime<Utc>> {
        self.end
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Inclusive numeric range with independently optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl ScoreRange {
    /// Create a range, rejecting non-finite bounds and `min > max`.
    pub fn new(min: Option<f64>, max: Option<f64>) -> AppResult<Self> {
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(AppError::validation("score bounds must be finite numbers"));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(AppError::validation(format!(
                "score range minimum {lo} is greater than maximum {hi}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Range with only a lower bound.
    pub fn at_least(min: f64) -> AppResult<Self> {
        Self::new(Some(min), None)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Overall opportunity tier, each a lower bound on `overall_opportunity_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunityLevel {
    Hot,
    Great,
    Good,
}

impl OpportunityLevel {
    /// Minimum overall opportunity score for this tier.
    pub fn threshold(self) -> i64 {
        match self {
            OpportunityLevel::Hot => 80,
            OpportunityLevel::Great => 70,
            OpportunityLevel::Good => 60,
        }
    }
}

impl FromStr for OpportunityLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(OpportunityLevel::Hot),
            "great" => Ok(OpportunityLevel::Great),
            "good" => Ok(OpportunityLevel::Good),
            other => Err(AppError::validation(format!(
                "unknown overall opportunity level '{other}' (expected hot, great, or good)"
            ))),
        }
    }
}

/// Optional predicates for one report request.
///
/// Absent (`None`, empty, or blank) fields contribute nothing to the query.
/// Multiple values inside one list field are alternatives; distinct fields
/// must all hold.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    /// Case-insensitive substring over event name, venue, or performer.
    pub search_term: Option<String>,
    /// Case-insensitive venue substrings.
    pub venues: Vec<String>,
    /// Case-insensitive performer substrings.
    pub performers: Vec<String>,
    /// Case-insensitive event type substring.
    pub event_type: Option<String>,
    pub opportunity_score: ScoreRange,
    pub confidence: ScoreRange,
    /// Range on `analysis_generated_at`.
    pub generated: DateRange,
    pub event_date: DateRange,
    pub onsale_date: DateRange,
    pub presale_date: DateRange,
    /// Case-insensitive exact match.
    pub market_volatility_level: Option<String>,
    /// Case-insensitive exact match.
    pub demand_uncertainty_level: Option<String>,
    /// Case-insensitive exact match.
    pub competition_level: Option<String>,
    pub overall_opportunity_level: Option<OpportunityLevel>,
    pub min_estimated_profit: Option<f64>,
    /// Primary sort for listings; `None` means `opportunity_score DESC`.
    pub sort: Option<SortSpec>,
}

// -------------------------------------------------------------------------
// Pagination
// -------------------------------------------------------------------------

/// Page size defaults and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Validated pagination parameters (1-indexed page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate raw pagination input.
    ///
    /// A page below 1 or a page size of 0 or less is rejected. A page size
    /// above the ceiling is clamped to it.
    pub fn resolve(page: Option<i64>, page_size: Option<i64>, limits: PageLimits) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation(format!(
                "page must be at least 1 (got {page})"
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| AppError::validation(format!("page {page} is out of range")))?;

        let requested = page_size.unwrap_or(i64::from(limits.default_page_size));
        if requested < 1 {
            return Err(AppError::validation(format!(
                "page_size must be at least 1 (got {requested})"
            )));
        }
        let max = i64::from(limits.max_page_size);
        let page_size = if requested > max {
            tracing::warn!(
                requested = requested,
                capped = limits.max_page_size,
                "page_size exceeds maximum, capping"
            );
            limits.max_page_size
        } else {
            u32::try_from(requested).map_err(|_| {
                AppError::validation(format!("page_size {requested} is out of range"))
            })?
        };

        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows to skip: `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

// -------------------------------------------------------------------------
// Sorting
// -------------------------------------------------------------------------

/// Primary sort key for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    OpportunityScore,
    OverallOpportunity,
    Buyability,
    EstimatedProfit,
    EventDate,
    EmailTs,
    AnalysisGeneratedAt,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "opportunity_score" => Ok(SortField::OpportunityScore),
            "overallOpportunity" => Ok(SortField::OverallOpportunity),
            "buyability" => Ok(SortField::Buyability),
            "estimated_profit" => Ok(SortField::EstimatedProfit),
            "event_date" => Ok(SortField::EventDate),
            "email_ts" => Ok(SortField::EmailTs),
            "analysis_generated_at" => Ok(SortField::AnalysisGeneratedAt),
            other => Err(AppError::validation(format!("unknown sort field '{other}'"))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascend,
    #[default]
    Descend,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascend" | "asc" => Ok(SortOrder::Ascend),
            "descend" | "desc" => Ok(SortOrder::Descend),
            other => Err(AppError::validation(format!(
                "unknown sort order '{other}' (expected ascend or descend)"
            ))),
        }
    }
}

/// Primary sort for a listing. `analysis_generated_at DESC, id ASC` always follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

// -------------------------------------------------------------------------
// Distinct-value fields
// -------------------------------------------------------------------------

/// Fields that can be enumerated as filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    Venue,
    Performer,
    EventType,
}

// -------------------------------------------------------------------------
// Responses
// -------------------------------------------------------------------------

/// One page of analyses plus paging metadata.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPage {
    pub items: Vec<AnalysisRecord>,
    /// Records matching the filter, ignoring pagination.
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl AnalysisPage {
    /// Create a page with paging calculations.
    pub fn new(items: Vec<AnalysisRecord>, total_count: u64, request: &PageRequest) -> Self {
        let page_size = u64::from(request.page_size());
        let total_pages = total_count.div_ceil(page_size);

        Self {
            items,
            total_count,
            page: request.page(),
            page_size: request.page_size(),
            total_pages,
            has_next: u64::from(request.page()) < total_pages,
            has_prev: request.page() > 1,
        }
    }
}

/// Count of records at one market-qualifier level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LevelCount {
    pub level: String,
    pub count: i64,
}

/// Average score and count for one performer or venue.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GroupScore {
    pub name: String,
    pub avg_score: f64,
    pub count: i64,
}

/// Count for one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

/// Opportunity band counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpportunityBands {
    /// `opportunity_score >= 75`
    pub high: i64,
    /// `50 <= opportunity_score < 75`
    pub medium: i64,
    /// `opportunity_score < 50`
    pub low: i64,
    /// `overall_opportunity_score >= 80`
    pub hot: i64,
    /// `overall_opportunity_score >= 70`
    pub great: i64,
    /// `overall_opportunity_score >= 60`
    pub good: i64,
    /// `overall_opportunity_score < 60`
    pub pass: i64,
}

/// Dashboard statistics over a filtered record set.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_count: u64,
    /// 0.0 when no records match.
    pub average_opportunity_score: f64,
    pub min_opportunity_score: Option<f64>,
    pub max_opportunity_score: Option<f64>,
    pub bands: OpportunityBands,
    pub market_volatility_breakdown: Vec<LevelCount>,
    pub demand_uncertainty_breakdown: Vec<LevelCount>,
    pub competition_breakdown: Vec<LevelCount>,
    pub top_performers: Vec<GroupScore>,
    pub top_venues: Vec<GroupScore>,
    pub event_type_distribution: Vec<NamedCount>,
    pub recent_analyses: Vec<AnalysisRecord>,
}

/// Distinct values available for a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub items: Vec<String>,
    pub total: usize,
}

impl FilterOptions {
    /// Deduplicate and sort values ascending (byte order, case preserved).
    pub fn from_values(mut values: Vec<String>) -> Self {
        values.sort();
        values.dedup();
        let total = values.len();
        Self {
            items: values,
            total,
        }
    }
}
