//! Analysis query builder using SeaQuery.
//!
//! Turns an [`AnalysisFilter`] into a [`PredicateSet`] once, then renders
//! every statement a request needs from that one set:
//! - count and page (shared predicates keep totals and pages consistent)
//! - summary aggregates, level breakdowns, top groups
//! - distinct filter options
//!
//! Statements render with positional placeholders; user input only ever
//! travels in the accompanying [`Values`].

use sea_query::{
    Alias, Asterisk, BinOper, Cond, Expr, Func, NullOrdering, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, Values,
};

use super::types::{AnalysisFilter, DateRange, DistinctField, ScoreRange, SortField, SortOrder, SortSpec};

/// Table every statement reads from.
pub const TABLE: &str = "onsale_email_analysis";

/// Rows returned by `build_top_groups` and `build_distribution`.
pub const TOP_GROUP_LIMIT: u64 = 10;

/// Rows returned by `build_recent`.
pub const RECENT_LIMIT: u64 = 5;

/// Bucket for NULL or blank market-qualifier levels.
pub const UNKNOWN_LEVEL: &str = "unknown";

/// How a column is projected so decoding does not depend on storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    /// Selected as stored.
    Plain,
    /// `CAST(col AS float8)` for numeric columns.
    Float,
    /// `CAST(col AS int8)` for integer columns.
    BigInt,
    /// `CAST(col AS timestamptz)`.
    Timestamp,
}

/// Columns of `onsale_email_analysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    EmailId,
    EmailSubject,
    EmailFrom,
    EmailTo,
    EmailTs,
    AnalysisGeneratedAt,
    EventName,
    VenueName,
    VenueLocation,
    Performer,
    EventType,
    EventUrl,
    EventDate,
    EventDateTimezone,
    OnsaleDate,
    OnsaleDateTimezone,
    PresaleDate,
    PresaleDateTimezone,
    DiscountCode,
    OpportunityScore,
    ConfidencePercentage,
    TargetMarginPercentage,
    RiskFactors,
    Opportunities,
    ReasoningSummary,
    HistoricalContext,
    BuyingGuidance,
    RiskManagement,
    NextSteps,
    MarketVolatilityLevel,
    DemandUncertaintyLevel,
    CompetitionLevel,
    RecommendedBuyAmountMin,
    RecommendedBuyAmountMax,
    TargetResaleMarkupPercentage,
    StopLossPercentage,
    BuyabilityScore,
    EstimatedTotalProfit,
    OverallOpportunityScore,
    AdditionalDetails,
    CreatedAt,
    UpdatedAt,
}

/// Full record projection, in decode order.
const RECORD_COLUMNS: [Column; 43] = [
    Column::Id,
    Column::EmailId,
    Column::EmailSubject,
    Column::EmailFrom,
    Column::EmailTo,
    Column::EmailTs,
    Column::AnalysisGeneratedAt,
    Column::EventName,
    Column::VenueName,
    Column::VenueLocation,
    Column::Performer,
    Column::EventType,
    Column::EventUrl,
    Column::EventDate,
    Column::EventDateTimezone,
    Column::OnsaleDate,
    Column::OnsaleDateTimezone,
    Column::PresaleDate,
    Column::PresaleDateTimezone,
    Column::DiscountCode,
    Column::OpportunityScore,
    Column::ConfidencePercentage,
    Column::TargetMarginPercentage,
    Column::RiskFactors,
    Column::Opportunities,
    Column::ReasoningSummary,
    Column::HistoricalContext,
    Column::BuyingGuidance,
    Column::RiskManagement,
    Column::NextSteps,
    Column::MarketVolatilityLevel,
    Column::DemandUncertaintyLevel,
    Column::CompetitionLevel,
    Column::RecommendedBuyAmountMin,
    Column::RecommendedBuyAmountMax,
    Column::TargetResaleMarkupPercentage,
    Column::StopLossPercentage,
    Column::BuyabilityScore,
    Column::EstimatedTotalProfit,
    Column::OverallOpportunityScore,
    Column::AdditionalDetails,
    Column::CreatedAt,
    Column::UpdatedAt,
];

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::EmailId => "email_id",
            Column::EmailSubject => "email_subject",
            Column::EmailFrom => "email_from",
            Column::EmailTo => "email_to",
            Column::EmailTs => "email_ts",
            Column::AnalysisGeneratedAt => "analysis_generated_at",
            Column::EventName => "event_name",
            Column::VenueName => "venue_name",
            Column::VenueLocation => "venue_location",
            Column::Performer => "performer",
            Column::EventType => "event_type",
            Column::EventUrl => "event_url",
            Column::EventDate => "event_date",
            Column::EventDateTimezone => "event_date_timezone",
            Column::OnsaleDate => "onsale_date",
            Column::OnsaleDateTimezone => "onsale_date_timezone",
            Column::PresaleDate => "presale_date",
            Column::PresaleDateTimezone => "presale_date_timezone",
            Column::DiscountCode => "discount_code",
            Column::OpportunityScore => "opportunity_score",
            Column::ConfidencePercentage => "confidence_percentage",
            Column::TargetMarginPercentage => "target_margin_percentage",
            Column::RiskFactors => "risk_factors",
            Column::Opportunities => "opportunities",
            Column::ReasoningSummary => "reasoning_summary",
            Column::HistoricalContext => "historical_context",
            Column::BuyingGuidance => "buying_guidance",
            Column::RiskManagement => "risk_management",
            Column::NextSteps => "next_steps",
            Column::MarketVolatilityLevel => "market_volatility_level",
            Column::DemandUncertaintyLevel => "demand_uncertainty_level",
            Column::CompetitionLevel => "competition_level",
            Column::RecommendedBuyAmountMin => "recommended_buy_amount_min",
            Column::RecommendedBuyAmountMax => "recommended_buy_amount_max",
            Column::TargetResaleMarkupPercentage => "target_resale_markup_percentage",
            Column::StopLossPercentage => "stop_loss_percentage",
            Column::BuyabilityScore => "buyability_score",
            Column::EstimatedTotalProfit => "estimated_total_profit",
            Column::OverallOpportunityScore => "overall_opportunity_score",
            Column::AdditionalDetails => "additional_details",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
        }
    }

    fn projection(self) -> Projection {
        match self {
            Column::OpportunityScore
            | Column::ConfidencePercentage
            | Column::TargetMarginPercentage
            | Column::TargetResaleMarkupPercentage
            | Column::StopLossPercentage
            | Column::BuyabilityScore
            | Column::EstimatedTotalProfit => Projection::Float,
            Column::RecommendedBuyAmountMin
            | Column::RecommendedBuyAmountMax
            | Column::OverallOpportunityScore => Projection::BigInt,
            Column::EmailTs
            | Column::AnalysisGeneratedAt
            | Column::EventDate
            | Column::OnsaleDate
            | Column::PresaleDate
            | Column::CreatedAt
            | Column::UpdatedAt => Projection::Timestamp,
            _ => Projection::Plain,
        }
    }

    fn alias(self) -> Alias {
        Alias::new(self.name())
    }
}

impl From<DistinctField> for Column {
    fn from(field: DistinctField) -> Self {
        match field {
            DistinctField::Venue => Column::VenueName,
            DistinctField::Performer => Column::Performer,
            DistinctField::EventType => Column::EventType,
        }
    }
}

impl From<SortField> for Column {
    fn from(field: SortField) -> Self {
        match field {
            SortField::OpportunityScore => Column::OpportunityScore,
            SortField::OverallOpportunity => Column::OverallOpportunityScore,
            SortField::Buyability => Column::BuyabilityScore,
            SortField::EstimatedProfit => Column::EstimatedTotalProfit,
            SortField::EventDate => Column::EventDate,
            SortField::EmailTs => Column::EmailTs,
            SortField::AnalysisGeneratedAt => Column::AnalysisGeneratedAt,
        }
    }
}

/// Market-qualifier columns that get a per-level breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelField {
    MarketVolatility,
    DemandUncertainty,
    Competition,
}

impl LevelField {
    fn column(self) -> Column {
        match self {
            LevelField::MarketVolatility => Column::MarketVolatilityLevel,
            LevelField::DemandUncertainty => Column::DemandUncertaintyLevel,
            LevelField::Competition => Column::CompetitionLevel,
        }
    }
}

/// Columns summarized as `{name, avg_score, count}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Performer,
    Venue,
}

impl GroupField {
    fn column(self) -> Column {
        match self {
            GroupField::Performer => Column::Performer,
            GroupField::Venue => Column::VenueName,
        }
    }
}

/// A rendered statement: SQL with `$n` placeholders plus aligned values.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub values: Values,
}

impl BuiltQuery {
    fn from_select(query: &SelectStatement) -> Self {
        let (sql, values) = query.build(PostgresQueryBuilder);
        Self { sql, values }
    }
}

/// Ordered WHERE conditions built from one filter.
///
/// Every condition compares a column against bound values. The set is
/// built once per request and applied to each statement so count and page
/// always see identical predicates.
#[derive(Debug, Clone, Default)]
pub struct PredicateSet {
    conditions: Vec<SimpleExpr>,
}

impl PredicateSet {
    /// Build predicates from a filter. Absent and blank fields add nothing.
    pub fn from_filter(filter: &AnalysisFilter) -> Self {
        let mut set = Self::default();

        if let Some(term) = non_blank(filter.search_term.as_deref()) {
            let pattern = contains_pattern(term);
            set.push(
                Cond::any()
                    .add(lower_like(Column::EventName, &pattern))
                    .add(lower_like(Column::VenueName, &pattern))
                    .add(lower_like(Column::Performer, &pattern))
                    .into(),
            );
        }

        set.push_any_contains(Column::VenueName, &filter.venues);
        set.push_any_contains(Column::Performer, &filter.performers);

        if let Some(event_type) = non_blank(filter.event_type.as_deref()) {
            set.push(lower_like(Column::EventType, &contains_pattern(event_type)));
        }

        set.push_score_range(Column::OpportunityScore, &filter.opportunity_score);
        set.push_score_range(Column::ConfidencePercentage, &filter.confidence);

        set.push_date_range(Column::AnalysisGeneratedAt, &filter.generated);
        set.push_date_range(Column::EventDate, &filter.event_date);
        set.push_date_range(Column::OnsaleDate, &filter.onsale_date);
        set.push_date_range(Column::PresaleDate, &filter.presale_date);

        set.push_level_eq(Column::MarketVolatilityLevel, filter.market_volatility_level.as_deref());
        set.push_level_eq(Column::DemandUncertaintyLevel, filter.demand_uncertainty_level.as_deref());
        set.push_level_eq(Column::CompetitionLevel, filter.competition_level.as_deref());

        if let Some(level) = filter.overall_opportunity_level {
            set.push(Expr::col(Column::OverallOpportunityScore.alias()).gte(level.threshold()));
        }

        if let Some(profit) = filter.min_estimated_profit {
            set.push(Expr::col(Column::EstimatedTotalProfit.alias()).gte(profit));
        }

        set
    }

    /// Whether no predicate was added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// AND every predicate into `query`'s WHERE clause.
    fn apply(&self, query: &mut SelectStatement) {
        for condition in &self.conditions {
            query.and_where(condition.clone());
        }
    }

    fn push(&mut self, condition: SimpleExpr) {
        self.conditions.push(condition);
    }

    fn push_any_contains(&mut self, column: Column, values: &[String]) {
        let patterns: Vec<String> = values
            .iter()
            .filter_map(|v| non_blank(Some(v)))
            .map(contains_pattern)
            .collect();

        match patterns.as_slice() {
            [] => {}
            [single] => self.push(lower_like(column, single)),
            many => {
                let mut any = Cond::any();
                for pattern in many {
                    any = any.add(lower_like(column, pattern));
                }
                self.push(any.into());
            }
        }
    }

    fn push_score_range(&mut self, column: Column, range: &ScoreRange) {
        if let Some(min) = range.min() {
            self.push(Expr::col(column.alias()).gte(min));
        }
        if let Some(max) = range.max() {
            self.push(Expr::col(column.alias()).lte(max));
        }
    }

    fn push_date_range(&mut self, column: Column, range: &DateRange) {
        if let Some(lower) = range.lower_bound() {
            self.push(Expr::col(column.alias()).gte(lower));
        }
        if let Some(upper) = range.upper_bound_exclusive() {
            self.push(Expr::col(column.alias()).lt(upper));
        }
    }

    fn push_level_eq(&mut self, column: Column, value: Option<&str>) {
        if let Some(level) = non_blank(value) {
            self.push(lower_column(column).binary(BinOper::Equal, lower_value(level)));
        }
    }
}

/// Statement factory over one filter's predicates.
pub struct AnalysisQueryBuilder {
    predicates: PredicateSet,
    sort: Option<SortSpec>,
}

impl AnalysisQueryBuilder {
    pub fn new(filter: &AnalysisFilter) -> Self {
        Self {
            predicates: PredicateSet::from_filter(filter),
            sort: filter.sort,
        }
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }

    /// `SELECT COUNT(*) FROM onsale_email_analysis [WHERE ...]`
    pub fn build_count(&self) -> BuiltQuery {
        let mut query = Query::select();
        query
            .expr(Expr::col(Asterisk).count())
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        BuiltQuery::from_select(&query)
    }

    /// Full projection for one page in deterministic order.
    pub fn build_page(&self, limit: u64, offset: u64) -> BuiltQuery {
        let mut query = Self::record_select();
        self.predicates.apply(&mut query);
        self.add_sort(&mut query);
        query.limit(limit).offset(offset);
        BuiltQuery::from_select(&query)
    }

    /// Count, average/min/max score, and opportunity band counts.
    pub fn build_stats(&self) -> BuiltQuery {
        let mut query = Query::select();
        query
            .expr_as(Expr::col(Asterisk).count(), Alias::new("total_count"))
            .expr_as(
                Expr::cust("AVG(opportunity_score)::float8"),
                Alias::new("avg_score"),
            )
            .expr_as(
                Expr::cust("MIN(opportunity_score)::float8"),
                Alias::new("min_score"),
            )
            .expr_as(
                Expr::cust("MAX(opportunity_score)::float8"),
                Alias::new("max_score"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE opportunity_score >= 75)"),
                Alias::new("high"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE opportunity_score >= 50 AND opportunity_score < 75)"),
                Alias::new("medium"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE opportunity_score < 50)"),
                Alias::new("low"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE overall_opportunity_score >= 80)"),
                Alias::new("hot"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE overall_opportunity_score >= 70)"),
                Alias::new("great"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE overall_opportunity_score >= 60)"),
                Alias::new("good"),
            )
            .expr_as(
                Expr::cust("COUNT(*) FILTER (WHERE overall_opportunity_score < 60)"),
                Alias::new("pass"),
            )
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        BuiltQuery::from_select(&query)
    }

    /// `{level, count}` per distinct level; NULL and blank fold into `unknown`.
    pub fn build_level_breakdown(&self, field: LevelField) -> BuiltQuery {
        let level = Expr::cust(format!(
            "COALESCE(NULLIF(TRIM(\"{}\"), ''), '{UNKNOWN_LEVEL}')",
            field.column().name()
        ));

        let mut query = Query::select();
        query
            .expr_as(level.clone(), Alias::new("level"))
            .expr_as(Expr::col(Asterisk).count(), Alias::new("count"))
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        query
            .add_group_by([level])
            .order_by(Alias::new("count"), Order::Desc)
            .order_by(Alias::new("level"), Order::Asc);
        BuiltQuery::from_select(&query)
    }

    /// Top groups by average opportunity score.
    pub fn build_top_groups(&self, field: GroupField) -> BuiltQuery {
        let column = field.column();

        let mut query = Query::select();
        query
            .expr_as(Expr::col(column.alias()), Alias::new("name"))
            .expr_as(
                Expr::cust("AVG(opportunity_score)::float8"),
                Alias::new("avg_score"),
            )
            .expr_as(Expr::col(Asterisk).count(), Alias::new("count"))
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        query
            .and_where(non_blank_column(column))
            .group_by_col(column.alias())
            .order_by(Alias::new("avg_score"), Order::Desc)
            .order_by(Alias::new("count"), Order::Desc)
            .order_by(Alias::new("name"), Order::Asc)
            .limit(TOP_GROUP_LIMIT);
        BuiltQuery::from_select(&query)
    }

    /// Most common event types with counts.
    pub fn build_distribution(&self) -> BuiltQuery {
        let column = Column::EventType;

        let mut query = Query::select();
        query
            .expr_as(Expr::col(column.alias()), Alias::new("name"))
            .expr_as(Expr::col(Asterisk).count(), Alias::new("count"))
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        query
            .and_where(non_blank_column(column))
            .group_by_col(column.alias())
            .order_by(Alias::new("count"), Order::Desc)
            .order_by(Alias::new("name"), Order::Asc)
            .limit(TOP_GROUP_LIMIT);
        BuiltQuery::from_select(&query)
    }

    /// Most recently generated records.
    pub fn build_recent(&self) -> BuiltQuery {
        let mut query = Self::record_select();
        self.predicates.apply(&mut query);
        query
            .order_by(Column::AnalysisGeneratedAt.alias(), Order::Desc)
            .order_by(Column::Id.alias(), Order::Asc)
            .limit(RECENT_LIMIT);
        BuiltQuery::from_select(&query)
    }

    /// Distinct non-null, non-blank values of one column.
    pub fn build_distinct(&self, field: DistinctField) -> BuiltQuery {
        let column = Column::from(field);

        let mut query = Query::select();
        query
            .distinct()
            .expr_as(Expr::col(column.alias()), Alias::new("value"))
            .from(Alias::new(TABLE));
        self.predicates.apply(&mut query);
        query.and_where(non_blank_column(column));
        BuiltQuery::from_select(&query)
    }

    /// Exact-match lookup by id. Ignores the filter.
    pub fn build_by_id(id: &str) -> BuiltQuery {
        let mut query = Self::record_select();
        query
            .and_where(Expr::col(Column::Id.alias()).eq(id))
            .limit(1);
        BuiltQuery::from_select(&query)
    }

    fn record_select() -> SelectStatement {
        let mut query = Query::select();
        for column in RECORD_COLUMNS {
            let col = Expr::col(column.alias());
            match column.projection() {
                Projection::Plain => {
                    query.column(column.alias());
                }
                Projection::Float => {
                    query.expr_as(Func::cast_as(col, Alias::new("float8")), column.alias());
                }
                Projection::BigInt => {
                    query.expr_as(Func::cast_as(col, Alias::new("int8")), column.alias());
                }
                Projection::Timestamp => {
                    query.expr_as(Func::cast_as(col, Alias::new("timestamptz")), column.alias());
                }
            }
        }
        query.from(Alias::new(TABLE));
        query
    }

    /// Primary sort, then `analysis_generated_at DESC, id ASC`.
    fn add_sort(&self, query: &mut SelectStatement) {
        let primary = match self.sort {
            Some(spec) => {
                let column = Column::from(spec.field);
                let order = match spec.order {
                    SortOrder::Ascend => Order::Asc,
                    SortOrder::Descend => Order::Desc,
                };
                query.order_by_with_nulls(column.alias(), order, NullOrdering::Last);
                column
            }
            None => {
                query.order_by(Column::OpportunityScore.alias(), Order::Desc);
                Column::OpportunityScore
            }
        };

        if primary != Column::AnalysisGeneratedAt {
            query.order_by(Column::AnalysisGeneratedAt.alias(), Order::Desc);
        }
        query.order_by(Column::Id.alias(), Order::Asc);
    }
}

/// `LOWER(col) LIKE LOWER($n)`
///
/// Both sides fold case in the database so the comparison follows its
/// collation, not Rust's Unicode tables.
fn lower_like(column: Column, pattern: &str) -> SimpleExpr {
    lower_column(column).binary(BinOper::Like, lower_value(pattern))
}

fn lower_column(column: Column) -> SimpleExpr {
    Func::lower(Expr::col(column.alias())).into()
}

fn lower_value(value: &str) -> SimpleExpr {
    Func::lower(Expr::val(value.to_string())).into()
}

/// `col IS NOT NULL AND TRIM(col) <> ''`
fn non_blank_column(column: Column) -> SimpleExpr {
    Cond::all()
        .add(Expr::col(column.alias()).is_not_null())
        .add(Expr::cust(format!("TRIM(\"{}\") <> ''", column.name())))
        .into()
}

/// Trimmed value, or `None` when absent or blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Escaped `%value%` pattern.
fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like_wildcards(value))
}

/// Escape LIKE wildcard characters in user input.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
