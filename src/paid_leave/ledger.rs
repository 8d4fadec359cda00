//! Monthly carry-forward of paid-leave hours.
//!
//! One snapshot row per user and month, written once and never rewritten.
//! A run targets the month before its `as_of` date and only touches users
//! that have no snapshot for it yet, so a crashed or repeated run resumes
//! where it stopped. Runs are expected from a single process at a time.

use anyhow::{Context, bail};
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use futures::{TryFutureExt, try_join};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::error::{StoreError, TimekeepingError, TimekeepingResult};
use crate::model::{Contract, PaidLeaveSnapshot};
use crate::ports::Ports;
use crate::timekeeping::aggregator::{MonthlyAggregator, authorized_leave_hours};
use crate::timekeeping::calendar::{month_bounds, previous_month};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Balance brought into December of last year that a reset may forfeit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForfeitureBasis {
    pub last_year_hours_left: f64,
    /// `hours_used` of this year's snapshots before the target month.
    pub used_earlier_this_year: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementInput {
    pub prior_hours_left: f64,
    pub accrual_hours: f64,
    pub authorized_leave_hours: f64,
    /// Present only in the configured reset month.
    pub forfeiture: Option<ForfeitureBasis>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub incoming_hours: f64,
    pub used_hours: f64,
    pub forfeited_hours: f64,
    pub outgoing_hours: f64,
}

/// The month's arithmetic: usage capped by what came in, forfeiture limited
/// to last year's hours still unused.
pub fn settle_month(input: &SettlementInput) -> Settlement {
    let incoming = input.prior_hours_left + input.accrual_hours;
    let used = input.authorized_leave_hours.min(incoming.max(0.0)).max(0.0);
    let forfeited = input.forfeiture.map_or(0.0, |basis| {
        forfeitable_hours(
            basis.last_year_hours_left,
            basis.used_earlier_this_year + used,
        )
    });

    Settlement {
        incoming_hours: incoming,
        used_hours: used,
        forfeited_hours: forfeited,
        outgoing_hours: incoming - used - forfeited,
    }
}

/// Hours credited for a month starting on `month_start`.
pub fn monthly_accrual(contract: Option<&Contract>, month_start: NaiveDate) -> f64 {
    contract
        .filter(|c| c.started_by(month_start))
        .map_or(0.0, Contract::monthly_paid_leave_hours)
}

pub fn forfeitable_hours(last_year_hours_left: f64, used_this_year: f64) -> f64 {
    (last_year_hours_left - used_this_year).max(0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct LedgerRunSummary {
    #[schema(example = 1)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
    /// The target month is the year's configured reset month.
    pub reset_month: bool,
    /// Users without a snapshot when the run started.
    pub pending_users: usize,
    pub inserted: usize,
    pub failed_batches: usize,
    pub failed_user_ids: Vec<u64>,
}

#[derive(Clone)]
pub struct PaidLeaveLedger {
    ports: Ports,
    aggregator: MonthlyAggregator,
    batch_size: usize,
}

impl PaidLeaveLedger {
    pub fn new(ports: Ports, aggregator: MonthlyAggregator, batch_size: usize) -> Self {
        Self {
            ports,
            aggregator,
            batch_size: batch_size.max(1),
        }
    }

    /// Appends the snapshot of the month before `as_of` for every user that
    /// lacks one.
    ///
    /// A batch whose computation or insert fails is skipped and logged; its
    /// users stay unprocessed for the next run. A duplicate-key rejection
    /// means two writers raced on the same month and ends the run. An
    /// `as_of` after today is refused: its target month is still open.
    #[instrument(skip(self))]
    pub async fn run_monthly_job(&self, as_of: NaiveDate) -> anyhow::Result<LedgerRunSummary> {
        let today = self.aggregator.today();
        if as_of > today {
            bail!("cannot settle the month before {as_of}: today is {today}");
        }
        let (year, month) = previous_month(as_of.year(), as_of.month());

        let (pending, reset_month) = try_join!(
            self.ports.ledger.list_unprocessed_user_ids(month, year),
            self.ports.settings.get_annual_reset_month(year),
        )
        .with_context(|| format!("loading ledger inputs for {year}-{month:02}"))?;

        let (first, last) = month_bounds(year, month)
            .with_context(|| format!("no calendar month {year}-{month:02}"))?;
        let is_reset_month = reset_month == Some(month);

        let mut summary = LedgerRunSummary {
            month,
            year,
            reset_month: is_reset_month,
            pending_users: pending.len(),
            ..Default::default()
        };
        info!(
            month,
            year,
            users = pending.len(),
            reset_month = summary.reset_month,
            "paid leave ledger run started"
        );

        for batch in pending.chunks(self.batch_size) {
            let settled = try_join_all(
                batch
                    .iter()
                    .map(|&user_id| self.settle_user(user_id, first, last, is_reset_month)),
            )
            .await;

            let snapshots = match settled {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    error!(error = %e, user_ids = ?batch, month, year, "ledger batch computation failed");
                    summary.failed_batches += 1;
                    summary.failed_user_ids.extend_from_slice(batch);
                    continue;
                }
            };

            match self.ports.ledger.insert_snapshots(&snapshots).await {
                Ok(()) => summary.inserted += snapshots.len(),
                Err(StoreError::Duplicate(detail)) => {
                    error!(user_ids = ?batch, month, year, %detail, "ledger snapshot written twice");
                    bail!("duplicate paid leave snapshot for {year}-{month:02}: {detail}");
                }
                Err(e) => {
                    error!(error = %e, user_ids = ?batch, month, year, "ledger batch insert failed");
                    summary.failed_batches += 1;
                    summary.failed_user_ids.extend_from_slice(batch);
                }
            }
        }

        info!(
            month,
            year,
            inserted = summary.inserted,
            failed_batches = summary.failed_batches,
            "paid leave ledger run finished"
        );
        Ok(summary)
    }

    async fn settle_user(
        &self,
        user_id: u64,
        first: NaiveDate,
        last: NaiveDate,
        reset_month: bool,
    ) -> TimekeepingResult<PaidLeaveSnapshot> {
        let (year, month) = (first.year(), first.month());
        let (prior_year, prior_month) = previous_month(year, month);

        let (prior, contract, timesheet) = try_join!(
            self.ports
                .ledger
                .get_snapshot(user_id, prior_month, prior_year)
                .err_into::<TimekeepingError>(),
            self.ports
                .contracts
                .get_active_contract(user_id)
                .err_into::<TimekeepingError>(),
            self.aggregator.build_timesheet(user_id, first, last),
        )?;

        let forfeiture = if reset_month {
            let (december, this_year) = try_join!(
                self.ports.ledger.get_snapshot(user_id, 12, year - 1),
                self.ports.ledger.list_snapshots_for_year(user_id, year),
            )?;
            Some(ForfeitureBasis {
                last_year_hours_left: december.map_or(0.0, |s| s.hours_left),
                used_earlier_this_year: this_year
                    .iter()
                    .filter(|s| s.month < month)
                    .map(|s| s.hours_used)
                    .sum(),
            })
        } else {
            None
        };

        let settlement = settle_month(&SettlementInput {
            prior_hours_left: prior.map_or(0.0, |s| s.hours_left),
            accrual_hours: monthly_accrual(contract.as_ref(), first),
            authorized_leave_hours: authorized_leave_hours(&timesheet)?,
            forfeiture,
        });
        debug!(
            user_id,
            month,
            year,
            incoming = settlement.incoming_hours,
            used = settlement.used_hours,
            forfeited = settlement.forfeited_hours,
            outgoing = settlement.outgoing_hours,
            "paid leave month settled"
        );

        Ok(PaidLeaveSnapshot {
            user_id,
            month,
            year,
            hours_left: settlement.outgoing_hours,
            hours_used: settlement.used_hours,
        })
    }

    /// Balance closing the last month that ended before `date`.
    pub async fn balance_as_of(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<PaidLeaveSnapshot>, StoreError> {
        let (year, month) = previous_month(date.year(), date.month());
        self.ports
            .ledger
            .latest_snapshot_until(user_id, month, year)
            .await
    }

    pub async fn history(
        &self,
        user_id: u64,
        year: i32,
    ) -> Result<Vec<PaidLeaveSnapshot>, StoreError> {
        self.ports.ledger.list_snapshots_for_year(user_id, year).await
    }
}
