//! In-memory implementation of every port, for engine tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::model::{Contract, ContractStatus, DailyRecord, Holiday, LeaveRequest, PaidLeaveSnapshot};
use crate::ports::{
    ContractLookup, ContractMaintenance, HolidayLookup, LeaveRequestLookup, LedgerStore, Ports,
    SettingLookup, TimekeepingLookup, TimekeepingWriter,
};

#[derive(Default)]
struct State {
    users: BTreeSet<u64>,
    records: Vec<DailyRecord>,
    leaves: Vec<LeaveRequest>,
    contracts: Vec<Contract>,
    snapshots: Vec<PaidLeaveSnapshot>,
    holidays: Vec<Holiday>,
    reset_schedule: HashMap<i32, u32>,
    failing_inserts: HashSet<u64>,
    next_record_id: u64,
    upserts: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_user(self, user_id: u64) -> Self {
        self.state().users.insert(user_id);
        self
    }

    pub fn with_record(self, record: DailyRecord) -> Self {
        {
            let mut state = self.state();
            state.users.insert(record.user_id);
            state.next_record_id = state.next_record_id.max(record.id.unwrap_or(0));
            state.records.push(record);
        }
        self
    }

    pub fn with_leave(self, leave: LeaveRequest) -> Self {
        self.state().leaves.push(leave);
        self
    }

    pub fn with_contract(self, contract: Contract) -> Self {
        self.state().contracts.push(contract);
        self
    }

    pub fn with_snapshot(self, snapshot: PaidLeaveSnapshot) -> Self {
        self.state().snapshots.push(snapshot);
        self
    }

    pub fn with_holiday(self, holiday: Holiday) -> Self {
        self.state().holidays.push(holiday);
        self
    }

    pub fn with_reset_month(self, year: i32, month: u32) -> Self {
        self.state().reset_schedule.insert(year, month);
        self
    }

    /// Any snapshot insert containing this user fails with a query error.
    pub fn failing_insert_for(self, user_id: u64) -> Self {
        self.state().failing_inserts.insert(user_id);
        self
    }

    pub fn clear_failures(&self) {
        self.state().failing_inserts.clear();
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn ports(self: &Arc<Self>) -> Ports {
        Ports {
            contracts: self.clone(),
            leave_requests: self.clone(),
            timekeeping: self.clone(),
            ledger: self.clone(),
            holidays: self.clone(),
            settings: self.clone(),
        }
    }

    pub fn snapshot(&self, user_id: u64, month: u32, year: i32) -> Option<PaidLeaveSnapshot> {
        self.state()
            .snapshots
            .iter()
            .find(|s| s.user_id == user_id && s.month == month && s.year == year)
            .cloned()
    }

    pub fn snapshots(&self) -> Vec<PaidLeaveSnapshot> {
        self.state().snapshots.clone()
    }

    pub fn records(&self) -> Vec<DailyRecord> {
        self.state().records.clone()
    }

    pub fn contract_status(&self, contract_id: u64) -> Option<ContractStatus> {
        self.state()
            .contracts
            .iter()
            .find(|c| c.id == contract_id)
            .map(|c| c.status)
    }

    pub fn upsert_count(&self) -> usize {
        self.state().upserts
    }
}

#[async_trait]
impl ContractLookup for InMemoryStore {
    async fn get_active_contract(&self, user_id: u64) -> Result<Option<Contract>, StoreError> {
        Ok(self
            .state()
            .contracts
            .iter()
            .filter(|c| c.user_id == user_id && c.status == ContractStatus::Active)
            .max_by_key(|c| c.start_date)
            .cloned())
    }
}

#[async_trait]
impl ContractMaintenance for InMemoryStore {
    async fn activate_due(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let mut changed = 0;
        for contract in self.state().contracts.iter_mut() {
            if contract.status == ContractStatus::AboutToActive && contract.start_date <= today {
                contract.status = ContractStatus::Active;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let mut changed = 0;
        for contract in self.state().contracts.iter_mut() {
            if contract.status == ContractStatus::Active
                && contract.end_date.is_some_and(|end| end < today)
            {
                contract.status = ContractStatus::Expired;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl LeaveRequestLookup for InMemoryStore {
    async fn get_approved(
        &self,
        user_id: u64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        Ok(self
            .state()
            .leaves
            .iter()
            .filter(|l| l.user_id == user_id && l.is_approved())
            .filter(|l| l.start_at <= end && l.end_at >= start)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TimekeepingLookup for InMemoryStore {
    async fn get_by_user_and_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError> {
        let mut records: Vec<DailyRecord> = self
            .state()
            .records
            .iter()
            .filter(|r| r.user_id == user_id && (start..=end).contains(&r.date))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

#[async_trait]
impl TimekeepingWriter for InMemoryStore {
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<DailyRecord, StoreError> {
        let mut state = self.state();
        state.upserts += 1;

        if let Some(stored) = state
            .records
            .iter_mut()
            .find(|r| r.user_id == record.user_id && r.date == record.date)
        {
            stored.check_in = record.check_in;
            stored.check_out = record.check_out;
            return Ok(stored.clone());
        }

        state.next_record_id += 1;
        let stored = DailyRecord {
            id: Some(state.next_record_id),
            ..record.clone()
        };
        state.records.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get_snapshot(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError> {
        Ok(self.snapshot(user_id, month, year))
    }

    async fn insert_snapshots(&self, snapshots: &[PaidLeaveSnapshot]) -> Result<(), StoreError> {
        let mut state = self.state();
        if let Some(s) = snapshots
            .iter()
            .find(|s| state.failing_inserts.contains(&s.user_id))
        {
            return Err(StoreError::Query(format!(
                "injected failure for user {}",
                s.user_id
            )));
        }
        let duplicate = snapshots.iter().find(|new| {
            state
                .snapshots
                .iter()
                .any(|s| s.user_id == new.user_id && s.month == new.month && s.year == new.year)
        });
        if let Some(s) = duplicate {
            return Err(StoreError::Duplicate(format!(
                "{}-{}-{}",
                s.user_id, s.month, s.year
            )));
        }
        state.snapshots.extend_from_slice(snapshots);
        Ok(())
    }

    async fn list_unprocessed_user_ids(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<u64>, StoreError> {
        let state = self.state();
        Ok(state
            .users
            .iter()
            .copied()
            .filter(|&user_id| {
                !state
                    .snapshots
                    .iter()
                    .any(|s| s.user_id == user_id && s.month == month && s.year == year)
            })
            .collect())
    }

    async fn list_snapshots_for_year(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<PaidLeaveSnapshot>, StoreError> {
        let mut snapshots: Vec<PaidLeaveSnapshot> = self
            .state()
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id && s.year == year)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.month);
        Ok(snapshots)
    }

    async fn latest_snapshot_until(
        &self,
        user_id: u64,
        month: u32,
        year: i32,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError> {
        Ok(self
            .state()
            .snapshots
            .iter()
            .filter(|s| s.user_id == user_id && (s.year, s.month) <= (year, month))
            .max_by_key(|s| (s.year, s.month))
            .cloned())
    }
}

#[async_trait]
impl HolidayLookup for InMemoryStore {
    async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        Ok(self
            .state()
            .holidays
            .iter()
            .filter(|h| (start..=end).contains(&h.date))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingLookup for InMemoryStore {
    async fn get_annual_reset_month(&self, year: i32) -> Result<Option<u32>, StoreError> {
        Ok(self.state().reset_schedule.get(&year).copied())
    }
}
