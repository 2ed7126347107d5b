//! OnSale email analysis reports.
//!
//! Filtered, paginated reads over `onsale_email_analysis`:
//! - [`query_builder`] turns a filter into parameterized statements
//! - [`service`] runs them in one bounded transaction per request
//! - [`types`] and [`record`] shape the results, with [`timezone`]
//!   localizing per-row dates

pub mod binder;
pub mod params;
pub mod query_builder;
pub mod record;
pub mod service;
pub mod timezone;
pub mod types;

pub use params::ReportParams;
pub use query_builder::{AnalysisQueryBuilder, PredicateSet};
pub use record::AnalysisRecord;
pub use service::ReportService;
pub use types::{
    AnalysisFilter, AnalysisPage, AnalysisSummary, DateRange, DistinctField, FilterOptions,
    OpportunityLevel, PageLimits, PageRequest, ScoreRange, SortField, SortOrder, SortSpec,
};
