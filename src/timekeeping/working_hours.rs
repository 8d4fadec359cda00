//! Worked, authorized-leave and unauthorized-leave hours of a single day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{TimekeepingError, TimekeepingResult};
use crate::model::LeaveInterval;
use crate::timekeeping::calendar::{
    Edge, MINUTES_PER_HOUR, WORKING_HOURS_PER_DAY, WorkingWindow, clip_to_workday,
};

/// Everything known about one user on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DayAttendance {
    #[schema(example = "2026-01-05")]
    pub date: NaiveDate,
    #[schema(nullable = true)]
    pub record_id: Option<u64>,
    #[schema(nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    /// Approved leave slices falling on this day.
    pub leaves: Vec<LeaveInterval>,
    /// Neither a weekend nor a company holiday.
    pub working_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct DailyHours {
    #[schema(example = 8.0)]
    pub working_hours: f64,
    #[schema(example = 0.0)]
    pub authorized_leave_hours: f64,
    /// `8 - (worked + authorized)`. Goes negative when leave recorded outside
    /// the worked span pushes the total past a nominal day; it is reported
    /// as-is.
    #[schema(example = 0.0)]
    pub unauthorized_leave_hours: f64,
}

#[derive(Debug, Default)]
struct LeaveMinutes {
    all_day: i64,
    in_work: i64,
}

/// Reconciles a day's check-in/out with its approved leave.
///
/// Weekend and holiday handling belongs to the caller: this answers what
/// happened on the day regardless of its type.
pub fn compute_daily_working_hours(day: &DayAttendance) -> TimekeepingResult<DailyHours> {
    validate(day)?;
    let window = WorkingWindow::for_date(day.date);

    // A scan inside an approved absence is not presence: push it to the
    // absence's edge.
    let mut check_in = day.check_in;
    let mut check_out = day.check_out;
    for leave in &day.leaves {
        if check_in.is_some_and(|t| leave.strictly_contains(t)) {
            check_in = Some(leave.end_at);
        }
        if check_out.is_some_and(|t| leave.strictly_contains(t)) {
            check_out = Some(leave.start_at);
        }
    }

    let (check_in, check_out) = match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => (
            clip_to_workday(check_in, day.date, Edge::Start),
            clip_to_workday(check_out, day.date, Edge::End),
        ),
        // never signed out (or never in): no worked time at all
        _ => {
            let leave = leave_minutes(&window, &day.leaves, None);
            let authorized = to_hours(leave.all_day);
            return Ok(DailyHours {
                working_hours: 0.0,
                authorized_leave_hours: authorized,
                unauthorized_leave_hours: WORKING_HOURS_PER_DAY - authorized,
            });
        }
    };

    let span = window.span_minutes(check_in, check_out);
    let leave = leave_minutes(&window, &day.leaves, Some((check_in, check_out)));

    Ok(DailyHours {
        working_hours: to_hours((span - leave.in_work).max(0)),
        authorized_leave_hours: to_hours(leave.all_day),
        unauthorized_leave_hours: WORKING_HOURS_PER_DAY
            - to_hours(span - leave.in_work + leave.all_day),
    })
}

fn validate(day: &DayAttendance) -> TimekeepingResult<()> {
    if let Some(leave) = day.leaves.iter().find(|l| l.end_at <= l.start_at) {
        return Err(TimekeepingError::InvalidInterval {
            start: leave.start_at,
            end: leave.end_at,
        });
    }
    if let (Some(check_in), Some(check_out)) = (day.check_in, day.check_out) {
        if check_out < check_in {
            return Err(TimekeepingError::CheckOutBeforeCheckIn {
                date: day.date,
                check_in,
                check_out,
            });
        }
    }
    Ok(())
}

fn leave_minutes(
    window: &WorkingWindow,
    leaves: &[LeaveInterval],
    worked: Option<(NaiveDateTime, NaiveDateTime)>,
) -> LeaveMinutes {
    let mut minutes = LeaveMinutes::default();
    for leave in leaves {
        let start = window.snap_lunch(leave.start_at, Edge::Start);
        let end = window.snap_lunch(leave.end_at, Edge::End);
        minutes.all_day += window.span_minutes(start, end);

        if let Some((check_in, check_out)) = worked {
            let from = start.max(check_in);
            let to = end.min(check_out);
            if from < to {
                minutes.in_work += window.span_minutes(from, to);
            }
        }
    }
    minutes
}

fn to_hours(minutes: i64) -> f64 {
    minutes as f64 / MINUTES_PER_HOUR
}
