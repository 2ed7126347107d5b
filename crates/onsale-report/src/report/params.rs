//! Query-string parameters for the report endpoints.
//!
//! `venue` and `performer` repeat; every other key is scalar and the last
//! occurrence wins. Unknown keys are ignored.

use chrono::NaiveDate;

use super::types::{
    AnalysisFilter, DateRange, OpportunityLevel, PageLimits, PageRequest, ScoreRange, SortField,
    SortOrder, SortSpec,
};
use crate::error::{AppError, AppResult};

/// Raw, unvalidated report parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search_term: Option<String>,
    pub venues: Vec<String>,
    pub performers: Vec<String>,
    pub event_type: Option<String>,
    pub opportunity_score_min: Option<String>,
    pub opportunity_score_max: Option<String>,
    pub confidence_min: Option<String>,
    pub confidence_max: Option<String>,
    pub generated_start: Option<String>,
    pub generated_end: Option<String>,
    pub event_date_start: Option<String>,
    pub event_date_end: Option<String>,
    pub onsale_date_start: Option<String>,
    pub onsale_date_end: Option<String>,
    pub presale_date_start: Option<String>,
    pub presale_date_end: Option<String>,
    pub market_volatility_level: Option<String>,
    pub demand_uncertainty_level: Option<String>,
    pub competition_level: Option<String>,
    pub overall_opportunity_level: Option<String>,
    pub min_estimated_profit: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

impl ReportParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            let slot = match &*key {
                "venue" => {
                    params.venues.push(value);
                    continue;
                }
                "performer" => {
                    params.performers.push(value);
                    continue;
                }
                "page" => &mut params.page,
                "page_size" => &mut params.page_size,
                "search_term" => &mut params.search_term,
                "event_type" => &mut params.event_type,
                "opportunity_score_min" => &mut params.opportunity_score_min,
                "opportunity_score_max" => &mut params.opportunity_score_max,
                "confidence_min" => &mut params.confidence_min,
                "confidence_max" => &mut params.confidence_max,
                "generated_start" => &mut params.generated_start,
                "generated_end" => &mut params.generated_end,
                "event_date_start" => &mut params.event_date_start,
                "event_date_end" => &mut params.event_date_end,
                "onsale_date_start" => &mut params.onsale_date_start,
                "onsale_date_end" => &mut params.onsale_date_end,
                "presale_date_start" => &mut params.presale_date_start,
                "presale_date_end" => &mut params.presale_date_end,
                "market_volatility_level" => &mut params.market_volatility_level,
                "demand_uncertainty_level" => &mut params.demand_uncertainty_level,
                "competition_level" => &mut params.competition_level,
                "overall_opportunity_level" => &mut params.overall_opportunity_level,
                "min_estimated_profit" => &mut params.min_estimated_profit,
                "sort_field" => &mut params.sort_field,
                "sort_order" => &mut params.sort_order,
                _ => continue,
            };
            *slot = Some(value);
        }

        params
    }

    /// Validate pagination against configured limits.
    pub fn page_request(&self, limits: PageLimits) -> AppResult<PageRequest> {
        let page = parse_opt::<i64>("page", self.page.as_deref())?;
        let page_size = parse_opt::<i64>("page_size", self.page_size.as_deref())?;
        PageRequest::resolve(page, page_size, limits)
    }

    /// Validate and normalize every filter field.
    pub fn to_filter(&self) -> AppResult<AnalysisFilter> {
        let opportunity_score = ScoreRange::new(
            parse_opt("opportunity_score_min", self.opportunity_score_min.as_deref())?,
            parse_opt("opportunity_score_max", self.opportunity_score_max.as_deref())?,
        )?;
        let confidence = ScoreRange::new(
            parse_opt("confidence_min", self.confidence_min.as_deref())?,
            parse_opt("confidence_max", self.confidence_max.as_deref())?,
        )?;

        let min_estimated_profit: Option<f64> =
            parse_opt("min_estimated_profit", self.min_estimated_profit.as_deref())?;
        if let Some(profit) = min_estimated_profit
            && !profit.is_finite()
        {
            return Err(AppError::validation("min_estimated_profit must be a finite number"));
        }

        let overall_opportunity_level = present(self.overall_opportunity_level.as_deref())
            .map(str::parse::<OpportunityLevel>)
            .transpose()?;

        Ok(AnalysisFilter {
            search_term: present(self.search_term.as_deref()).map(str::to_string),
            venues: present_list(&self.venues),
            performers: present_list(&self.performers),
            event_type: present(self.event_type.as_deref()).map(str::to_string),
            opportunity_score,
            confidence,
            generated: date_range(
                "generated",
                self.generated_start.as_deref(),
                self.generated_end.as_deref(),
            )?,
            event_date: date_range(
                "event_date",
                self.event_date_start.as_deref(),
                self.event_date_end.as_deref(),
            )?,
            onsale_date: date_range(
                "onsale_date",
                self.onsale_date_start.as_deref(),
                self.onsale_date_end.as_deref(),
            )?,
            presale_date: date_range(
                "presale_date",
                self.presale_date_start.as_deref(),
                self.presale_date_end.as_deref(),
            )?,
            market_volatility_level: present(self.market_volatility_level.as_deref()).map(str::to_string),
            demand_uncertainty_level: present(self.demand_uncertainty_level.as_deref())
                .map(str::to_string),
            competition_level: present(self.competition_level.as_deref()).map(str::to_string),
            overall_opportunity_level,
            min_estimated_profit,
            sort: self.sort()?,
        })
    }

    /// Primary sort, if the caller chose one.
    ///
    /// A bare `sort_order` applies to the default `opportunity_score` key.
    pub fn sort(&self) -> AppResult<Option<SortSpec>> {
        let field = present(self.sort_field.as_deref())
            .map(str::parse::<SortField>)
            .transpose()?;
        let order = present(self.sort_order.as_deref())
            .map(str::parse::<SortOrder>)
            .transpose()?;

        Ok(match (field, order) {
            (None, None) => None,
            (field, order) => Some(SortSpec {
                field: field.unwrap_or_default(),
                order: order.unwrap_or_default(),
            }),
        })
    }
}

fn date_range(name: &str, start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    let start = parse_date(&format!("{name}_start"), start)?;
    let end = parse_date(&format!("{name}_end"), end)?;
    DateRange::new(start, end)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn present_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| present(Some(v)))
        .map(str::to_string)
        .collect()
}

fn parse_opt<T: std::str::FromStr>(name: &str, value: Option<&str>) -> AppResult<Option<T>> {
    present(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::validation(format!("{name} must be a number (got '{v}')")))
        })
        .transpose()
}

fn parse_date(name: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    present(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                AppError::validation(format!("{name} must be a date in YYYY-MM-DD format (got '{v}')"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_venue_and_performer_collected() {
        let params = ReportParams::from_query(Some(
            "venue=Madison%20Square%20Garden&venue=The+Forum&performer=Taylor&page=2",
        ));

        assert_eq!(params.venues, vec!["Madison Square Garden", "The Forum"]);
        assert_eq!(params.performers, vec!["Taylor"]);
        assert_eq!(params.page.as_deref(), Some("2"));
    }

    #[test]
    fn last_scalar_wins_and_unknown_ignored() {
        let params = ReportParams::from_query(Some("page=1&page=3&favorite_color=blue"));
        assert_eq!(params.page.as_deref(), Some("3"));
    }

    #[test]
    fn missing_query_is_empty() {
        assert_eq!(ReportParams::from_query(None), ReportParams::default());
    }

    #[test]
    fn blank_values_are_absent() {
        let params = ReportParams::from_query(Some(
            "venue=&venue=%20&search_term=&opportunity_score_min=&generated_start=",
        ));
        let filter = params.to_filter().unwrap();

        assert!(filter.venues.is_empty());
        assert!(filter.search_term.is_none());
        assert!(filter.opportunity_score.is_empty());
        assert!(filter.generated.is_empty());
    }

    #[test]
    fn malformed_number_rejected() {
        let params = ReportParams::from_query(Some("opportunity_score_min=high"));
        let err = params.to_filter().unwrap_err();
        assert!(err.to_string().contains("opportunity_score_min"));
    }

    #[test]
    fn malformed_date_rejected() {
        let params = ReportParams::from_query(Some("generated_start=01/02/2025"));
        let err = params.to_filter().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("generated_start"));
    }

    #[test]
    fn inverted_dates_rejected() {
        let params =
            ReportParams::from_query(Some("event_date_start=2025-06-02&event_date_end=2025-06-01"));
        assert!(matches!(params.to_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn full_filter_parsed() {
        let params = ReportParams::from_query(Some(
            "search_term=swift&event_type=Concert&opportunity_score_min=60&confidence_max=95\
             &generated_start=2025-01-01&generated_end=2025-01-31\
             &competition_level=High&overall_opportunity_level=great\
             &min_estimated_profit=250.5&sort_field=estimated_profit&sort_order=ascend",
        ));
        let filter = params.to_filter().unwrap();

        assert_eq!(filter.search_term.as_deref(), Some("swift"));
        assert_eq!(filter.event_type.as_deref(), Some("Concert"));
        assert_eq!(filter.opportunity_score.min(), Some(60.0));
        assert_eq!(filter.confidence.max(), Some(95.0));
        assert!(filter.generated.start().is_some());
        assert_eq!(filter.competition_level.as_deref(), Some("High"));
        assert_eq!(filter.overall_opportunity_level, Some(OpportunityLevel::Great));
        assert_eq!(filter.min_estimated_profit, Some(250.5));
        assert_eq!(
            filter.sort,
            Some(SortSpec {
                field: SortField::EstimatedProfit,
                order: SortOrder::Ascend,
            })
        );
    }

    #[test]
    fn unknown_sort_field_rejected() {
        let params = ReportParams::from_query(Some("sort_field=random()"));
        assert!(matches!(params.to_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn bare_sort_order_uses_default_field() {
        let params = ReportParams::from_query(Some("sort_order=ascend"));
        let sort = params.sort().unwrap().unwrap();
        assert_eq!(sort.field, SortField::OpportunityScore);
        assert_eq!(sort.order, SortOrder::Ascend);
    }

    #[test]
    fn page_request_validated() {
        let limits = PageLimits::default();

        let params = ReportParams::from_query(Some("page=0"));
        assert!(params.page_request(limits).is_err());

        let params = ReportParams::from_query(Some("page_size=-5"));
        assert!(params.page_request(limits).is_err());

        let params = ReportParams::from_query(Some("page_size=abc"));
        assert!(params.page_request(limits).is_err());

        let params = ReportParams::from_query(Some("page=2&page_size=500"));
        let page = params.page_request(limits).unwrap();
        assert_eq!(page.page(), 2);
        assert_eq!(page.page_size(), 100);
    }
}
