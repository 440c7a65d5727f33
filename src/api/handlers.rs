use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::error::ApiError;
use crate::analytics::{AggregationEngine, ReportBuilder};
use crate::models::{
    OverviewResult, RegionRow, Report, ReportSummary, TimelinePoint, TopCustomer, TopProduct,
};
use crate::notifier::{ChangeNotifier, RefreshCause};
use crate::storage::{FactStore, ReportStore};
use crate::validation::{validate, RawFilter};

pub struct AppState {
    pub engine: AggregationEngine,
    pub reports: ReportBuilder,
    pub report_store: Arc<dyn ReportStore>,
    pub notifier: Arc<ChangeNotifier>,
}

impl AppState {
    pub fn new(
        facts: Arc<dyn FactStore>,
        report_store: Arc<dyn ReportStore>,
        notifier: Arc<ChangeNotifier>,
        query_timeout: Duration,
    ) -> Self {
        let engine = AggregationEngine::new(facts, query_timeout);
        let reports = ReportBuilder::new(engine.clone(), Arc::clone(&report_store));

        Self {
            engine,
            reports,
            report_store,
            notifier,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreatedResponse {
    pub success: bool,
    pub message: &'static str,
    pub report_id: i64,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Sales dashboard API is running",
    })
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<DataResponse<OverviewResult>>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let data = state.engine.overview(&filter).await?;
    Ok(DataResponse::ok(data))
}

pub async fn top_products(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<TopProduct>>>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let data = state.engine.top_products(&filter).await?;
    Ok(DataResponse::ok(data))
}

pub async fn top_customers(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<TopCustomer>>>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let data = state.engine.top_customers(&filter).await?;
    Ok(DataResponse::ok(data))
}

pub async fn region_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<RegionRow>>>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let data = state.engine.region_stats(&filter).await?;
    Ok(DataResponse::ok(data))
}

pub async fn sales_timeline(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<TimelinePoint>>>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let data = state.engine.sales_timeline(&filter).await?;
    Ok(DataResponse::ok(data))
}

/// Build, persist and announce a report snapshot
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawFilter>, QueryRejection>,
) -> Result<Json<ReportCreatedResponse>, ApiError> {
    let Query(raw) = query?;
    let filter = validate(&raw)?;
    let report = state.reports.build(&filter).await?;

    let notified = state.notifier.publish(RefreshCause::ReportGenerated);
    info!(report_id = report.id, notified, "announced new report");

    Ok(Json(ReportCreatedResponse {
        success: true,
        message: "Report generated and saved successfully",
        report_id: report.id,
    }))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<ReportSummary>>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let data = state.report_store.list_reports(limit, offset).await?;
    Ok(DataResponse::ok(data))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<Report>>, ApiError> {
    let Path(id) = id?;
    match state.report_store.get_report(id).await? {
        Some(report) => Ok(DataResponse::ok(report)),
        None => Err(ApiError::NotFound("Report not found")),
    }
}
