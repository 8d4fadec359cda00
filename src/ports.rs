//! Data-access contracts consumed by the timekeeping and paid-leave engines.
//!
//! The MySQL store implements every trait here; tests substitute the
//! in-memory store or `mockall` doubles.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::model::{Contract, DailyRecord, Holiday, LeaveRequest, PaidLeaveSnapshot};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractLookup: Send + Sync {
    /// The user's ACTIVE contract with its contract type, if any.
    async fn get_active_contract(&self, user_id: u64) -> Result<Option<Contract>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractMaintenance: Send + Sync {
    /// ABOUT_TO_ACTIVE contracts starting on or before `today` become ACTIVE.
    async fn activate_due(&self, today: NaiveDate) -> Result<u64, StoreError>;

    /// ACTIVE contracts that ended before `today` become EXPIRED.
    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaveRequestLookup: Send + Sync {
    /// APPROVED requests of the user overlapping `[start, end]`.
    async fn get_approved(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<LeaveRequest>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimekeepingLookup: Send + Sync {
    async fn get_by_user_and_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimekeepingWriter: Send + Sync {
    /// Insert or replace the record for `(user_id, date)` and return it with its id.
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<DailyRecord, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_snapshot(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError>;

    /// Writes all rows in a single statement; either every row lands or none.
    async fn insert_snapshots(&self, snapshots: &[PaidLeaveSnapshot]) -> Result<(), StoreError>;

    /// Users without a snapshot for `(month, year)`, ascending by id.
    async fn list_unprocessed_user_ids(&self, month: u32, year: i32)
    -> Result<Vec<u64>, StoreError>;

    /// Snapshots of one calendar year ordered by month.
    async fn list_snapshots_for_year(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<PaidLeaveSnapshot>, StoreError>;

    /// The most recent snapshot at or before `(month, year)`.
    async fn latest_snapshot_until(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HolidayLookup: Send + Sync {
    async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingLookup: Send + Sync {
    /// Month (1-12) at which last year's unused paid leave is forfeited.
    async fn get_annual_reset_month(&self, year: i32) -> Result<Option<u32>, StoreError>;
}

/// The read-side collaborators of the aggregator and the ledger, bundled so
/// one store (or one test double) can be handed to both.
#[derive(Clone)]
pub struct Ports {
    pub contracts: Arc<dyn ContractLookup>,
    pub leave_requests: Arc<dyn LeaveRequestLookup>,
    pub timekeeping: Arc<dyn TimekeepingLookup>,
    pub ledger: Arc<dyn LedgerStore>,
    pub holidays: Arc<dyn HolidayLookup>,
    pub settings: Arc<dyn SettingLookup>,
}
