use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::model::PaidLeaveSnapshot;
use crate::paid_leave::PaidLeaveLedger;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RunQuery {
    /// Settles the month before this date (defaults to today)
    #[param(example = "2026-02-01")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Calendar year (defaults to the current year)
    #[param(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    /// Balance as it stood on this date (defaults to today)
    #[param(example = "2026-03-15")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub data: Vec<PaidLeaveSnapshot>,
}

/* =========================
Trigger the monthly ledger run
========================= */
#[utoipa::path(
    post,
    path = "/api/paid-leave/run",
    params(RunQuery),
    responses(
        (status = 200, description = "Run finished; failed batches are listed", body = LedgerRunSummary),
        (status = 400, description = "as_of lies in the future", body = Object, example = json!({
            "message": "as_of must not be after 2026-02-01"
        })),
        (status = 500, description = "Run aborted")
    ),
    tag = "Paid leave"
)]
pub async fn run_ledger(
    ledger: web::Data<PaidLeaveLedger>,
    config: web::Data<Config>,
    query: web::Query<RunQuery>,
) -> actix_web::Result<impl Responder> {
    let today = config.today();
    let as_of = query.as_of.unwrap_or(today);
    if as_of > today {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("as_of must not be after {today}")
        })));
    }

    let summary = ledger.run_monthly_job(as_of).await.map_err(|e| {
        tracing::error!(error = ?e, %as_of, "Paid leave ledger run failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(summary))
}

/* =========================
Ledger history of one year
========================= */
#[utoipa::path(
    get,
    path = "/api/paid-leave/{user_id}/history",
    params(
        ("user_id" = u64, Path, description = "User id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Snapshots in month order", body = HistoryResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Paid leave"
)]
pub async fn get_history(
    ledger: web::Data<PaidLeaveLedger>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let year = query.year.unwrap_or_else(|| config.today().year());

    let data = ledger.history(user_id, year).await.map_err(|e| {
        tracing::error!(error = %e, user_id, year, "Paid leave history failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(HistoryResponse { data }))
}

/* =========================
Balance on a given date
========================= */
#[utoipa::path(
    get,
    path = "/api/paid-leave/{user_id}/balance",
    params(
        ("user_id" = u64, Path, description = "User id"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Latest snapshot closed before the date", body = PaidLeaveSnapshot),
        (status = 404, description = "No snapshot yet", body = Object, example = json!({
            "message": "No paid leave snapshot before 2026-03-15"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Paid leave"
)]
pub async fn get_balance(
    ledger: web::Data<PaidLeaveLedger>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let date = query.date.unwrap_or_else(|| config.today());

    let snapshot = ledger.balance_as_of(user_id, date).await.map_err(|e| {
        tracing::error!(error = %e, user_id, %date, "Paid leave balance failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match snapshot {
        Some(snapshot) => Ok(HttpResponse::Ok().json(snapshot)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("No paid leave snapshot before {date}")
        }))),
    }
}
