//! Per-user monthly view: every day of a range with its hours, the range
//! totals and the paid-leave balance that backs them.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use futures::{TryFutureExt, try_join};
use serde::Serialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::error::{TimekeepingError, TimekeepingResult};
use crate::model::{DailyRecord, LeaveInterval, LeaveRequest};
use crate::paid_leave::ledger::{forfeitable_hours, monthly_accrual};
use crate::ports::Ports;
use crate::timekeeping::calendar::{
    HolidaySet, WORKING_HOURS_PER_DAY, WorkingWindow, days_in_range, end_of_day, month_bounds,
    previous_month, start_of_day,
};
use crate::timekeeping::working_hours::{DailyHours, DayAttendance, compute_daily_working_hours};

/// Every date of a range, in order.
pub type Timesheet = BTreeMap<NaiveDate, DayAttendance>;

/// How a day reads on the attendance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DayMark {
    FullDay,
    PaidLeave,
    Absent,
    Partial,
    NonWorkingDay,
    /// The day's data could not be computed.
    Invalid,
}

impl DayMark {
    pub fn classify(working_day: bool, hours: Option<&DailyHours>) -> Self {
        if !working_day {
            return DayMark::NonWorkingDay;
        }
        let Some(hours) = hours else {
            return DayMark::Invalid;
        };
        if hours.working_hours >= WORKING_HOURS_PER_DAY {
            DayMark::FullDay
        } else if hours.working_hours > 0.0 {
            DayMark::Partial
        } else if hours.unauthorized_leave_hours <= 0.0 {
            DayMark::PaidLeave
        } else if hours.authorized_leave_hours <= 0.0 {
            DayMark::Absent
        } else {
            DayMark::Partial
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayReport {
    #[serde(flatten)]
    pub attendance: DayAttendance,
    #[schema(nullable = true)]
    pub hours: Option<DailyHours>,
    pub mark: DayMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct MonthTotals {
    #[schema(example = 176.0)]
    pub expected_hours: f64,
    #[schema(example = 160.0)]
    pub worked_hours: f64,
    /// Working hours still ahead of today within the range.
    #[schema(example = 16.0)]
    pub remaining_hours: f64,
    pub authorized_leave_hours: f64,
    /// Counted only for working days already behind us.
    pub unauthorized_leave_hours: f64,
    pub paid_leave_hours: f64,
    pub unpaid_leave_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct LeaveBalance {
    /// `hours_left` of the snapshot closing the month before the range.
    pub carried_over_hours: f64,
    pub accrual_hours: f64,
    pub available_hours: f64,
    /// Last December's balance not yet used this year.
    pub last_year_remaining_hours: f64,
    #[schema(nullable = true, example = 3)]
    pub reset_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = Object)]
    pub days: BTreeMap<NaiveDate, DayReport>,
    pub totals: MonthTotals,
    pub balance: LeaveBalance,
}

/// Splits an approved leave into per-day slices inside `[start, end]`.
///
/// The first slice starts at the true start, the last ends at the true end,
/// and days in between span the whole workday. Weekends and holidays get no
/// slice, nor does a day the leave only touches outside the workday (a
/// leave ending at midnight, or starting after hours). A request that does
/// not move forward in time is kept as a single slice on its start day so
/// the calculator rejects it.
pub fn split_leave_by_day(
    leave: &LeaveRequest,
    start: NaiveDate,
    end: NaiveDate,
    holidays: &HolidaySet,
) -> Vec<(NaiveDate, LeaveInterval)> {
    let first = leave.start_at.date();
    let last = leave.end_at.date();

    if leave.end_at <= leave.start_at {
        return if (start..=end).contains(&first) {
            vec![(first, LeaveInterval::new(leave.start_at, leave.end_at))]
        } else {
            Vec::new()
        };
    }

    days_in_range(first.max(start), last.min(end))
        .filter(|day| holidays.is_working_day(*day))
        .filter_map(|day| {
            let window = WorkingWindow::for_date(day);
            let from = if day == first {
                leave.start_at
            } else {
                window.morning_start
            };
            let to = if day == last {
                leave.end_at
            } else {
                window.afternoon_end
            };
            (to > from).then(|| (day, LeaveInterval::new(from, to)))
        })
        .collect()
}

/// Lays records and approved leaves over every date of `[start, end]`.
pub fn assemble_timesheet(
    start: NaiveDate,
    end: NaiveDate,
    records: Vec<DailyRecord>,
    leaves: &[LeaveRequest],
    holidays: &HolidaySet,
) -> Timesheet {
    let mut records: HashMap<NaiveDate, DailyRecord> =
        records.into_iter().map(|r| (r.date, r)).collect();

    let mut slices: HashMap<NaiveDate, Vec<LeaveInterval>> = HashMap::new();
    for leave in leaves.iter().filter(|l| l.is_approved()) {
        for (day, slice) in split_leave_by_day(leave, start, end, holidays) {
            slices.entry(day).or_default().push(slice);
        }
    }

    days_in_range(start, end)
        .map(|date| {
            let record = records.remove(&date);
            let attendance = DayAttendance {
                date,
                record_id: record.as_ref().and_then(|r| r.id),
                check_in: record.as_ref().and_then(|r| r.check_in),
                check_out: record.as_ref().and_then(|r| r.check_out),
                leaves: slices.remove(&date).unwrap_or_default(),
                working_day: holidays.is_working_day(date),
            };
            (date, attendance)
        })
        .collect()
}

/// Authorized leave hours of a whole timesheet. Any malformed day fails the
/// sum: ledger figures are never built on partial data.
pub fn authorized_leave_hours(timesheet: &Timesheet) -> TimekeepingResult<f64> {
    timesheet
        .values()
        .filter(|day| day.working_day)
        .try_fold(0.0, |total, day| -> TimekeepingResult<f64> {
            Ok(total + compute_daily_working_hours(day)?.authorized_leave_hours)
        })
}

pub fn summarize(
    days: &BTreeMap<NaiveDate, DayReport>,
    today: NaiveDate,
    available_hours: f64,
) -> MonthTotals {
    let mut totals = MonthTotals::default();

    for (date, day) in days.iter().filter(|(_, d)| d.attendance.working_day) {
        totals.expected_hours += WORKING_HOURS_PER_DAY;
        if *date >= today {
            totals.remaining_hours += WORKING_HOURS_PER_DAY;
        }
        let Some(hours) = day.hours else { continue };
        totals.worked_hours += hours.working_hours;
        totals.authorized_leave_hours += hours.authorized_leave_hours;
        if *date < today {
            totals.unauthorized_leave_hours += hours.unauthorized_leave_hours;
        }
    }

    totals.paid_leave_hours = totals.authorized_leave_hours.min(available_hours).max(0.0);
    totals.unpaid_leave_hours = totals.authorized_leave_hours + totals.unauthorized_leave_hours
        - totals.paid_leave_hours;
    totals
}

#[derive(Clone)]
pub struct MonthlyAggregator {
    ports: Ports,
    zone: FixedOffset,
}

impl MonthlyAggregator {
    pub fn new(ports: Ports, zone: FixedOffset) -> Self {
        Self { ports, zone }
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.zone).date_naive()
    }

    pub async fn build_timesheet(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> TimekeepingResult<Timesheet> {
        if end < start {
            return Err(TimekeepingError::InvalidRange { start, end });
        }

        let (records, leaves, holidays) = try_join!(
            self.ports.timekeeping.get_by_user_and_range(user_id, start, end),
            self.ports
                .leave_requests
                .get_approved(user_id, start_of_day(start), end_of_day(end)),
            self.ports.holidays.list_in_range(start, end),
        )?;

        let holidays = HolidaySet::from_holidays(&holidays);
        Ok(assemble_timesheet(start, end, records, &leaves, &holidays))
    }

    pub async fn aggregate_month(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> TimekeepingResult<MonthlyReport> {
        self.aggregate_month_as_of(user_id, start, end, self.today())
            .await
    }

    #[instrument(skip(self))]
    pub async fn aggregate_month_as_of(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> TimekeepingResult<MonthlyReport> {
        let (prior_year, prior_month) = previous_month(start.year(), start.month());

        let (timesheet, contract, prior, reset_month, last_year_remaining) = try_join!(
            self.build_timesheet(user_id, start, end),
            self.ports
                .contracts
                .get_active_contract(user_id)
                .err_into::<TimekeepingError>(),
            self.ports
                .ledger
                .get_snapshot(user_id, prior_month, prior_year)
                .err_into::<TimekeepingError>(),
            self.ports
                .settings
                .get_annual_reset_month(start.year())
                .err_into::<TimekeepingError>(),
            self.last_year_remaining(user_id, start),
        )?;

        let month_start = month_bounds(start.year(), start.month())
            .map(|(first, _)| first)
            .unwrap_or(start);
        let carried_over_hours = prior.map_or(0.0, |s| s.hours_left);
        let accrual_hours = monthly_accrual(contract.as_ref(), month_start);
        let balance = LeaveBalance {
            carried_over_hours,
            accrual_hours,
            available_hours: carried_over_hours + accrual_hours,
            last_year_remaining_hours: last_year_remaining,
            reset_month,
        };

        let days: BTreeMap<NaiveDate, DayReport> = timesheet
            .into_iter()
            .map(|(date, attendance)| {
                let hours = match compute_daily_working_hours(&attendance) {
                    Ok(hours) => Some(hours),
                    Err(e) => {
                        warn!(user_id, %date, error = %e, "day left out of monthly report");
                        None
                    }
                };
                let mark = DayMark::classify(attendance.working_day, hours.as_ref());
                (
                    date,
                    DayReport {
                        attendance,
                        hours,
                        mark,
                    },
                )
            })
            .collect();

        let totals = summarize(&days, today, balance.available_hours);

        Ok(MonthlyReport {
            user_id,
            start_date: start,
            end_date: end,
            days,
            totals,
            balance,
        })
    }

    async fn last_year_remaining(&self, user_id: u64, start: NaiveDate) -> TimekeepingResult<f64> {
        let year = start.year();
        let (december, this_year) = try_join!(
            self.ports.ledger.get_snapshot(user_id, 12, year - 1),
            self.ports.ledger.list_snapshots_for_year(user_id, year),
        )?;

        let used: f64 = this_year
            .iter()
            .filter(|s| s.month < start.month())
            .map(|s| s.hours_used)
            .sum();
        Ok(forfeitable_hours(december.map_or(0.0, |s| s.hours_left), used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contract, ContractStatus, ContractType, Holiday, LeaveStatus, PaidLeaveSnapshot};
    use crate::test_support::InMemoryStore;
    use chrono::NaiveDateTime;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(day).and_hms_opt(h, m, 0).unwrap()
    }

    fn approved(id: u64, start_at: NaiveDateTime, end_at: NaiveDateTime) -> LeaveRequest {
        LeaveRequest {
            id,
            user_id: 1,
            start_at,
            end_at,
            status: LeaveStatus::Approved,
            reason: None,
        }
    }

    fn record(day: u32, check_in: (u32, u32), check_out: (u32, u32)) -> DailyRecord {
        DailyRecord {
            id: Some(day as u64),
            user_id: 1,
            date: d(day),
            check_in: Some(at(day, check_in.0, check_in.1)),
            check_out: Some(at(day, check_out.0, check_out.1)),
        }
    }

    fn contract(paid_leave_days: f64, start_date: NaiveDate) -> Contract {
        Contract {
            id: 1,
            user_id: 1,
            start_date,
            end_date: None,
            status: ContractStatus::Active,
            contract_type: ContractType {
                name: "Full-time".into(),
                paid_leave_days,
            },
        }
    }

    #[test]
    fn multi_day_leave_skips_weekend_and_clamps_to_range() {
        // Thursday afternoon through Monday morning, range ends Sunday
        let leave = approved(1, at(8, 13, 30), at(12, 12, 30));
        let slices = split_leave_by_day(&leave, d(5), d(11), &HolidaySet::default());

        assert_eq!(
            slices,
            vec![
                (d(8), LeaveInterval::new(at(8, 13, 30), at(8, 18, 0))),
                (d(9), LeaveInterval::new(at(9, 9, 0), at(9, 18, 0))),
            ]
        );
    }

    #[test]
    fn holidays_get_no_leave_slice() {
        let holidays = HolidaySet::from_holidays(&[Holiday {
            date: d(6),
            title: "Company day".into(),
        }]);
        let leave = approved(1, at(5, 9, 0), at(7, 18, 0));

        let days: Vec<NaiveDate> = split_leave_by_day(&leave, d(1), d(31), &holidays)
            .into_iter()
            .map(|(day, _)| day)
            .collect();
        assert_eq!(days, vec![d(5), d(7)]);
    }

    #[test]
    fn timesheet_has_placeholder_for_every_date() {
        let sheet = assemble_timesheet(
            d(5),
            d(11),
            vec![record(5, (9, 0), (18, 0))],
            &[approved(1, at(9, 9, 0), at(9, 18, 0))],
            &HolidaySet::default(),
        );

        assert_eq!(sheet.len(), 7);
        assert_eq!(sheet.keys().next(), Some(&d(5)));
        assert_eq!(sheet[&d(5)].record_id, Some(5));
        assert_eq!(sheet[&d(6)].record_id, None);
        assert_eq!(sheet[&d(6)].check_in, None);
        assert_eq!(sheet[&d(9)].leaves.len(), 1);
        assert!(!sheet[&d(10)].working_day);
    }

    #[test]
    fn pending_leave_is_ignored() {
        let mut pending = approved(1, at(6, 9, 0), at(6, 18, 0));
        pending.status = LeaveStatus::Pending;

        let sheet = assemble_timesheet(d(6), d(6), vec![], &[pending], &HolidaySet::default());
        assert!(sheet[&d(6)].leaves.is_empty());
    }

    #[actix_web::test]
    async fn aggregates_a_week() {
        let store = InMemoryStore::new()
            .with_user(1)
            .with_record(record(5, (9, 0), (18, 0)))
            .with_record(record(6, (10, 0), (17, 0)))
            .with_record(record(8, (9, 0), (12, 30)))
            .with_leave(approved(1, at(8, 13, 30), at(8, 18, 0)))
            .with_leave(approved(2, at(9, 9, 0), at(9, 18, 0)))
            .with_contract(contract(1.0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
            .with_snapshot(PaidLeaveSnapshot {
                user_id: 1,
                month: 12,
                year: 2025,
                hours_left: 2.0,
                hours_used: 0.0,
            })
            .with_reset_month(2026, 3)
            .shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        let report = aggregator
            .aggregate_month_as_of(1, d(5), d(11), d(12))
            .await
            .unwrap();

        let marks: Vec<DayMark> = report.days.values().map(|r| r.mark).collect();
        assert_eq!(
            marks,
            vec![
                DayMark::FullDay,
                DayMark::Partial,
                DayMark::Absent,
                DayMark::Partial,
                DayMark::PaidLeave,
                DayMark::NonWorkingDay,
                DayMark::NonWorkingDay,
            ]
        );

        assert_eq!(
            report.totals,
            MonthTotals {
                expected_hours: 40.0,
                worked_hours: 17.5,
                remaining_hours: 0.0,
                authorized_leave_hours: 12.5,
                unauthorized_leave_hours: 10.0,
                paid_leave_hours: 10.0,
                unpaid_leave_hours: 12.5,
            }
        );
        assert_eq!(
            report.balance,
            LeaveBalance {
                carried_over_hours: 2.0,
                accrual_hours: 8.0,
                available_hours: 10.0,
                last_year_remaining_hours: 2.0,
                reset_month: Some(3),
            }
        );
    }

    #[actix_web::test]
    async fn future_days_count_as_remaining_not_unauthorized() {
        let store = InMemoryStore::new().with_user(1).shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        // Wednesday: Mon and Tue are past, Wed through Fri still ahead
        let report = aggregator
            .aggregate_month_as_of(1, d(5), d(9), d(7))
            .await
            .unwrap();

        assert_eq!(report.totals.expected_hours, 40.0);
        assert_eq!(report.totals.remaining_hours, 24.0);
        assert_eq!(report.totals.unauthorized_leave_hours, 16.0);
        assert_eq!(report.balance, LeaveBalance::default());
    }

    #[actix_web::test]
    async fn holidays_are_not_expected_hours() {
        let store = InMemoryStore::new()
            .with_user(1)
            .with_holiday(Holiday {
                date: d(6),
                title: "Founders' day".into(),
            })
            .shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        let report = aggregator
            .aggregate_month_as_of(1, d(5), d(6), d(7))
            .await
            .unwrap();

        assert_eq!(report.days[&d(5)].mark, DayMark::Absent);
        assert_eq!(report.days[&d(6)].mark, DayMark::NonWorkingDay);
        assert_eq!(report.totals.expected_hours, 8.0);
        assert_eq!(report.totals.unauthorized_leave_hours, 8.0);
    }

    #[actix_web::test]
    async fn malformed_day_is_marked_invalid() {
        let broken = DailyRecord {
            id: Some(7),
            user_id: 1,
            date: d(7),
            check_in: Some(at(7, 17, 0)),
            check_out: Some(at(7, 9, 0)),
        };
        let store = InMemoryStore::new()
            .with_user(1)
            .with_record(record(6, (9, 0), (18, 0)))
            .with_record(broken)
            .shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        let report = aggregator
            .aggregate_month_as_of(1, d(6), d(7), d(8))
            .await
            .unwrap();

        assert_eq!(report.days[&d(6)].mark, DayMark::FullDay);
        assert_eq!(report.days[&d(7)].mark, DayMark::Invalid);
        assert!(report.days[&d(7)].hours.is_none());
        assert_eq!(report.totals.worked_hours, 8.0);
    }

    #[test]
    fn leave_ending_at_midnight_leaves_next_day_untouched() {
        let leave = approved(1, at(5, 9, 0), at(6, 0, 0));
        let slices = split_leave_by_day(&leave, d(1), d(31), &HolidaySet::default());

        assert_eq!(slices, vec![(d(5), LeaveInterval::new(at(5, 9, 0), at(5, 18, 0)))]);
    }

    #[test]
    fn leave_starting_after_hours_begins_next_day() {
        let leave = approved(1, at(5, 19, 0), at(6, 18, 0));
        let slices = split_leave_by_day(&leave, d(1), d(31), &HolidaySet::default());

        assert_eq!(slices, vec![(d(6), LeaveInterval::new(at(6, 9, 0), at(6, 18, 0)))]);
    }

    #[test]
    fn reversed_request_is_kept_for_rejection() {
        let leave = approved(1, at(7, 15, 0), at(7, 14, 0));
        let slices = split_leave_by_day(&leave, d(1), d(31), &HolidaySet::default());

        assert_eq!(slices, vec![(d(7), LeaveInterval::new(at(7, 15, 0), at(7, 14, 0)))]);
    }

    #[actix_web::test]
    async fn midnight_leave_reports_a_paid_day() {
        let store = InMemoryStore::new()
            .with_user(1)
            .with_leave(approved(1, at(5, 9, 0), at(6, 0, 0)))
            .shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        let report = aggregator
            .aggregate_month_as_of(1, d(5), d(6), d(7))
            .await
            .unwrap();

        assert_eq!(report.days[&d(5)].mark, DayMark::PaidLeave);
        assert_eq!(report.days[&d(6)].mark, DayMark::Absent);
        assert_eq!(report.totals.authorized_leave_hours, 8.0);
    }

    #[actix_web::test]
    async fn past_range_has_nothing_remaining() {
        let store = InMemoryStore::new().with_user(1).shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        // a week long gone: nothing is left to work
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2000, 1, 9).unwrap();
        let report = aggregator.aggregate_month(1, start, end).await.unwrap();

        assert!(aggregator.today() > end);
        assert_eq!(report.totals.expected_hours, 40.0);
        assert_eq!(report.totals.remaining_hours, 0.0);
        assert_eq!(report.totals.unauthorized_leave_hours, 40.0);
    }

    #[actix_web::test]
    async fn rejects_reversed_range() {
        let store = InMemoryStore::new().shared();
        let aggregator = MonthlyAggregator::new(store.ports(), FixedOffset::east_opt(7 * 3600).unwrap());

        let err = aggregator.build_timesheet(1, d(9), d(5)).await.unwrap_err();
        assert!(matches!(err, TimekeepingError::InvalidRange { .. }));
    }
}
