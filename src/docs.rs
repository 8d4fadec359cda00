use crate::api::paid_leave::HistoryResponse;
use crate::api::timekeeping::{ReconciledResponse, ScanBatch};
use crate::model::{
    Contract, ContractStatus, ContractType, DailyRecord, LeaveInterval, LeaveRequest, LeaveStatus,
    PaidLeaveSnapshot, ScanEvent,
};
use crate::paid_leave::LedgerRunSummary;
use crate::timekeeping::aggregator::{DayMark, DayReport, LeaveBalance, MonthTotals};
use crate::timekeeping::{DailyHours, DayAttendance, MonthlyReport};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Timekeeping API",
        version = "1.0.0",
        description = r#"
## Attendance reconciliation and paid-leave ledger

### 🔹 Key Features
- **Timekeeping**
  - Merge scanner events into one record per user and day
  - Monthly report of worked, authorized and unauthorized hours
- **Paid leave**
  - Monthly carry-forward ledger with yearly forfeiture
  - Balance on any date and yearly history
- **Holidays**
  - Reload the cached company holiday table

### 🕒 Time
All wall-clock times are in the configured reference timezone.
Scanner events are accepted as UTC instants.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::timekeeping::get_monthly_report,
        crate::api::timekeeping::ingest_scans,

        crate::api::paid_leave::run_ledger,
        crate::api::paid_leave::get_history,
        crate::api::paid_leave::get_balance,

        crate::api::holiday::reload_holidays
    ),
    components(
        schemas(
            ScanBatch,
            ScanEvent,
            ReconciledResponse,
            DailyRecord,
            MonthlyReport,
            DayReport,
            DayAttendance,
            DailyHours,
            DayMark,
            MonthTotals,
            LeaveBalance,
            LeaveInterval,
            LeaveRequest,
            LeaveStatus,
            Contract,
            ContractStatus,
            ContractType,
            PaidLeaveSnapshot,
            HistoryResponse,
            LedgerRunSummary
        )
    ),
    tags(
        (name = "Timekeeping", description = "Scan ingestion and attendance reports"),
        (name = "Paid leave", description = "Paid-leave ledger APIs"),
        (name = "Holidays", description = "Holiday reference data"),
    )
)]
pub struct ApiDoc;
