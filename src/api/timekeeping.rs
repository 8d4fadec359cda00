use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::error::TimekeepingError;
use crate::model::{DailyRecord, ScanEvent};
use crate::timekeeping::calendar::month_bounds;
use crate::timekeeping::{MonthlyAggregator, ScanReconciler};

/// Longest range a single report may cover.
const MAX_REPORT_DAYS: i64 = 366;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day of the report (defaults to the first day of the current month)
    #[param(example = "2026-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day of the report, inclusive (defaults to the end of the current month)
    #[param(example = "2026-01-31")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct ScanBatch {
    pub scans: Vec<ScanEvent>,
}

#[derive(Serialize, ToSchema)]
pub struct ReconciledResponse {
    /// Resulting record of every (user, day) the batch touched
    pub data: Vec<DailyRecord>,
}

/* =========================
Monthly timekeeping report
========================= */
#[utoipa::path(
    get,
    path = "/api/timekeeping/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "Per-day hours, totals and leave balance", body = MonthlyReport),
        (status = 400, description = "Invalid date range", body = Object, example = json!({
            "message": "end_date must not be before start_date"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Timekeeping"
)]
pub async fn get_monthly_report(
    aggregator: web::Data<MonthlyAggregator>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let today = config.today();
    let (month_start, month_end) = month_bounds(today.year(), today.month())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Internal Server Error"))?;
    let start = query.start_date.unwrap_or(month_start);
    let end = query.end_date.unwrap_or(month_end);

    if (end - start).num_days() >= MAX_REPORT_DAYS {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("date range must not exceed {MAX_REPORT_DAYS} days")
        })));
    }

    match aggregator.aggregate_month(user_id, start, end).await {
        Ok(report) => Ok(HttpResponse::Ok().json(report)),
        Err(TimekeepingError::InvalidRange { .. }) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "end_date must not be before start_date"
            })))
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, %start, %end, "Monthly report failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/* =========================
Ingest scanner events
========================= */
#[utoipa::path(
    post,
    path = "/api/timekeeping/scans",
    request_body(
        content = ScanBatch,
        description = "Normalized scanner events",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Scans merged into daily records", body = ReconciledResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Timekeeping"
)]
pub async fn ingest_scans(
    reconciler: web::Data<ScanReconciler>,
    body: web::Json<ScanBatch>,
) -> actix_web::Result<impl Responder> {
    let data = reconciler
        .reconcile_scans(&body.scans)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, scans = body.scans.len(), "Scan reconciliation failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ReconciledResponse { data }))
}
