//! OnSale email analysis report routes.
//!
//! Every route here requires a bearer token carrying the configured role.

use axum::{
    Extension, Router,
    extract::{Path, RawQuery, State},
    response::Json,
    routing::get,
};

use crate::auth::AuthorizedContext;
use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::report::{
    AnalysisPage, AnalysisRecord, AnalysisSummary, DistinctField, FilterOptions, ReportParams,
};
use crate::state::AppState;

/// Mount point for the report API.
pub const BASE_PATH: &str = "/reports/emails/onsale-analysis";

/// Create the analysis report router.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(BASE_PATH, get(list_analyses))
        .route(&format!("{BASE_PATH}/summary"), get(get_summary))
        .route(&format!("{BASE_PATH}/venues"), get(list_venues))
        .route(&format!("{BASE_PATH}/performers"), get(list_performers))
        .route(&format!("{BASE_PATH}/event-types"), get(list_event_types))
        .route(&format!("{BASE_PATH}/{{id}}"), get(get_analysis))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_role,
        ))
}

async fn list_analyses(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizedContext>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<AnalysisPage>> {
    let params = ReportParams::from_query(query.as_deref());
    let page = params.page_request(state.page_limits())?;
    let filter = params.to_filter()?;

    let result = state.reports().list_analyses(&ctx, &filter, page).await?;
    Ok(Json(result))
}

async fn get_summary(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizedContext>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<AnalysisSummary>> {
    let filter = ReportParams::from_query(query.as_deref()).to_filter()?;

    let summary = state.reports().get_summary(&ctx, &filter).await?;
    Ok(Json(summary))
}

async fn list_venues(
    state: State<AppState>,
    ctx: Extension<AuthorizedContext>,
    query: RawQuery,
) -> AppResult<Json<FilterOptions>> {
    distinct_values(state, ctx, query, DistinctField::Venue).await
}

async fn list_performers(
    state: State<AppState>,
    ctx: Extension<AuthorizedContext>,
    query: RawQuery,
) -> AppResult<Json<FilterOptions>> {
    distinct_values(state, ctx, query, DistinctField::Performer).await
}

async fn list_event_types(
    state: State<AppState>,
    ctx: Extension<AuthorizedContext>,
    query: RawQuery,
) -> AppResult<Json<FilterOptions>> {
    distinct_values(state, ctx, query, DistinctField::EventType).await
}

async fn distinct_values(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizedContext>,
    RawQuery(query): RawQuery,
    field: DistinctField,
) -> AppResult<Json<FilterOptions>> {
    let filter = ReportParams::from_query(query.as_deref()).to_filter()?;

    let options = state.reports().distinct_values(&ctx, field, &filter).await?;
    Ok(Json(options))
}

async fn get_analysis(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthorizedContext>,
    Path(id): Path<String>,
) -> AppResult<Json<AnalysisRecord>> {
    state
        .reports()
        .get_analysis(&ctx, &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}
