//! sqlx/MySQL implementation of the data-access ports.
//!
//! Columns holding instants (`check_in`, `check_out`, `start_at`, `end_at`)
//! are UTC `DATETIME`s; they are shifted into the reference offset on read
//! and back on write. `timekeepings.date` is already the local calendar day.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use sqlx::{FromRow, MySqlPool};
use tracing::warn;

use crate::error::StoreError;
use crate::model::{
    Contract, ContractStatus, ContractType, DailyRecord, Holiday, LeaveRequest, LeaveStatus,
    PaidLeaveSnapshot,
};
use crate::ports::{
    ContractLookup, ContractMaintenance, HolidayLookup, LeaveRequestLookup, LedgerStore, Ports,
    SettingLookup, TimekeepingLookup, TimekeepingWriter,
};
use crate::utils::db_utils::{SqlValue, build_bulk_insert, execute_insert};

/// `general_settings.key` of the yearly forfeiture schedule.
pub const RESET_SCHEDULE_SETTING: &str = "paid_leave_days_reset_schedule";

#[derive(FromRow)]
struct TimekeepingRow {
    id: u64,
    user_id: u64,
    date: NaiveDate,
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    user_id: u64,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    status: String,
    reason: Option<String>,
}

#[derive(FromRow)]
struct ContractRow {
    id: u64,
    user_id: u64,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    status: String,
    contract_type_name: String,
    paid_leave_days: f64,
}

#[derive(FromRow)]
struct SnapshotRow {
    user_id: u64,
    month: u32,
    year: i32,
    hours_left: f64,
    hours_used: f64,
}

impl From<SnapshotRow> for PaidLeaveSnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            user_id: row.user_id,
            month: row.month,
            year: row.year,
            hours_left: row.hours_left,
            hours_used: row.hours_used,
        }
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    zone: FixedOffset,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, zone: FixedOffset) -> Self {
        Self { pool, zone }
    }

    fn offset(&self) -> Duration {
        Duration::seconds(i64::from(self.zone.local_minus_utc()))
    }

    fn to_local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + self.offset()
    }

    fn to_utc(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - self.offset()
    }

    fn record_from_row(&self, row: TimekeepingRow) -> DailyRecord {
        DailyRecord {
            id: Some(row.id),
            user_id: row.user_id,
            date: row.date,
            check_in: row.check_in.map(|t| self.to_local(t)),
            check_out: row.check_out.map(|t| self.to_local(t)),
        }
    }
}

/// The store behind every read port, for wiring the engine.
pub fn ports(store: &Arc<MySqlStore>, holidays: Arc<dyn HolidayLookup>) -> Ports {
    Ports {
        contracts: store.clone(),
        leave_requests: store.clone(),
        timekeeping: store.clone(),
        ledger: store.clone(),
        holidays,
        settings: store.clone(),
    }
}

/// Reads one year's reset month from the schedule setting, e.g.
/// `{"2025": "2025-03", "2026": "2026-04"}`.
pub fn parse_reset_schedule(raw: &str, year: i32) -> Result<Option<u32>, StoreError> {
    let schedule: HashMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| StoreError::Decode(format!("{RESET_SCHEDULE_SETTING}: {e}")))?;

    let Some(value) = schedule.get(&year.to_string()) else {
        return Ok(None);
    };

    let malformed = || StoreError::Decode(format!("{RESET_SCHEDULE_SETTING}[{year}] = {value:?}"));
    let (value_year, month) = value.split_once('-').ok_or_else(malformed)?;
    let value_year: i32 = value_year.parse().map_err(|_| malformed())?;
    let month: u32 = month.parse().map_err(|_| malformed())?;
    if value_year != year || !(1..=12).contains(&month) {
        return Err(malformed());
    }
    Ok(Some(month))
}

#[async_trait]
impl ContractLookup for MySqlStore {
    async fn get_active_contract(&self, user_id: u64) -> Result<Option<Contract>, StoreError> {
        let rows = sqlx::query_as::<_, ContractRow>(
            r#"
            SELECT c.id, c.user_id, c.start_date, c.end_date, c.status,
                   t.name AS contract_type_name, t.paid_leave_days
            FROM contracts c
            JOIN contract_types t ON t.id = c.contract_type_id
            WHERE c.user_id = ? AND c.status = ?
            ORDER BY c.start_date DESC
            "#,
        )
        .bind(user_id)
        .bind(ContractStatus::Active.to_string())
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            warn!(user_id, active = rows.len(), "several active contracts, using the latest");
        }

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let status = row
            .status
            .parse::<ContractStatus>()
            .map_err(|e| StoreError::Decode(format!("contract {} status: {e}", row.id)))?;

        Ok(Some(Contract {
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            contract_type: ContractType {
                name: row.contract_type_name,
                paid_leave_days: row.paid_leave_days,
            },
        }))
    }
}

#[async_trait]
impl ContractMaintenance for MySqlStore {
    async fn activate_due(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = ?
            WHERE status = ? AND start_date <= ?
            "#,
        )
        .bind(ContractStatus::Active.to_string())
        .bind(ContractStatus::AboutToActive.to_string())
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = ?
            WHERE status = ? AND end_date < ?
            "#,
        )
        .bind(ContractStatus::Expired.to_string())
        .bind(ContractStatus::Active.to_string())
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LeaveRequestLookup for MySqlStore {
    async fn get_approved(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(
            r#"
            SELECT id, user_id, start_at, end_at, status, reason
            FROM leave_requests
            WHERE user_id = ? AND status = ? AND start_at <= ? AND end_at >= ?
            ORDER BY start_at
            "#,
        )
        .bind(user_id)
        .bind(LeaveStatus::Approved.to_string())
        .bind(self.to_utc(end))
        .bind(self.to_utc(start))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status = row
                    .status
                    .parse::<LeaveStatus>()
                    .map_err(|e| StoreError::Decode(format!("leave {} status: {e}", row.id)))?;
                Ok(LeaveRequest {
                    id: row.id,
                    user_id: row.user_id,
                    start_at: self.to_local(row.start_at),
                    end_at: self.to_local(row.end_at),
                    status,
                    reason: row.reason,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TimekeepingLookup for MySqlStore {
    async fn get_by_user_and_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError> {
        let rows = sqlx::query_as::<_, TimekeepingRow>(
            r#"
            SELECT id, user_id, date, check_in, check_out
            FROM timekeepings
            WHERE user_id = ? AND date BETWEEN ? AND ?
            ORDER BY date
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| self.record_from_row(row)).collect())
    }
}

#[async_trait]
impl TimekeepingWriter for MySqlStore {
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<DailyRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO timekeepings (user_id, date, check_in, check_out)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE check_in = VALUES(check_in), check_out = VALUES(check_out)
            "#,
        )
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.check_in.map(|t| self.to_utc(t)))
        .bind(record.check_out.map(|t| self.to_utc(t)))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, TimekeepingRow>(
            r#"
            SELECT id, user_id, date, check_in, check_out
            FROM timekeepings
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(record.user_id)
        .bind(record.date)
        .fetch_one(&self.pool)
        .await?;

        Ok(self.record_from_row(row))
    }
}

#[async_trait]
impl LedgerStore for MySqlStore {
    async fn get_snapshot(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT user_id, month, year, hours_left, hours_used
            FROM paid_leave_snapshots
            WHERE user_id = ? AND month = ? AND year = ?
            "#,
        )
        .bind(user_id)
        .bind(month)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PaidLeaveSnapshot::from))
    }

    async fn insert_snapshots(&self, snapshots: &[PaidLeaveSnapshot]) -> Result<(), StoreError> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let rows = snapshots
            .iter()
            .map(|s| {
                vec![
                    SqlValue::U64(s.user_id),
                    SqlValue::U32(s.month),
                    SqlValue::I32(s.year),
                    SqlValue::F64(s.hours_left),
                    SqlValue::F64(s.hours_used),
                ]
            })
            .collect();
        let insert = build_bulk_insert(
            "paid_leave_snapshots",
            &["user_id", "month", "year", "hours_left", "hours_used"],
            rows,
        )?;

        execute_insert(&self.pool, insert).await?;
        Ok(())
    }

    async fn list_unprocessed_user_ids(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT u.id
            FROM users u
            WHERE NOT EXISTS (
                SELECT 1 FROM paid_leave_snapshots s
                WHERE s.user_id = u.id AND s.month = ? AND s.year = ?
            )
            ORDER BY u.id
            "#,
        )
        .bind(month)
        .bind(year)
        .fetch(&self.pool)
        .try_collect()
        .await?;
        Ok(ids)
    }

    async fn list_snapshots_for_year(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<PaidLeaveSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT user_id, month, year, hours_left, hours_used
            FROM paid_leave_snapshots
            WHERE user_id = ? AND year = ?
            ORDER BY month
            "#,
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PaidLeaveSnapshot::from).collect())
    }

    async fn latest_snapshot_until(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT user_id, month, year, hours_left, hours_used
            FROM paid_leave_snapshots
            WHERE user_id = ? AND (year < ? OR (year = ? AND month <= ?))
            ORDER BY year DESC, month DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(year)
        .bind(year)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PaidLeaveSnapshot::from))
    }
}

#[async_trait]
impl HolidayLookup for MySqlStore {
    async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        let holidays = sqlx::query_as::<_, Holiday>(
            r#"
            SELECT date, title
            FROM holidays
            WHERE date BETWEEN ? AND ?
            ORDER BY date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(holidays)
    }
}

#[async_trait]
impl SettingLookup for MySqlStore {
    async fn get_annual_reset_month(&self, year: i32) -> Result<Option<u32>, StoreError> {
        let raw = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CAST(`values` AS CHAR)
            FROM general_settings
            WHERE `key` = ?
            "#,
        )
        .bind(RESET_SCHEDULE_SETTING)
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => parse_reset_schedule(&raw, year),
            None => Ok(None),
        }
    }
}
