//! Workday schedule, day classification and instant clipping.
//!
//! All values are wall-clock times in the reference timezone; conversion from
//! UTC happens in the store before anything reaches this module.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::model::Holiday;

pub const WORKING_HOURS_PER_DAY: f64 = 8.0;
pub const MINUTES_PER_HOUR: f64 = 60.0;

const LUNCH_BREAK_MINUTES: i64 = 60;

// Minutes after midnight: 09:00, 12:30, 13:30, 18:00.
const MORNING_START_MINUTE: i64 = 9 * 60;
const MORNING_END_MINUTE: i64 = 12 * 60 + 30;
const AFTERNOON_START_MINUTE: i64 = 13 * 60 + 30;
const AFTERNOON_END_MINUTE: i64 = 18 * 60;

/// Which side of an interval an instant belongs to. Decides where an instant
/// inside the lunch break snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// The fixed daily schedule: 09:00-12:30 and 13:30-18:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWindow {
    pub morning_start: NaiveDateTime,
    pub morning_end: NaiveDateTime,
    pub afternoon_start: NaiveDateTime,
    pub afternoon_end: NaiveDateTime,
}

impl WorkingWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let midnight = start_of_day(date);
        Self {
            morning_start: midnight + Duration::minutes(MORNING_START_MINUTE),
            morning_end: midnight + Duration::minutes(MORNING_END_MINUTE),
            afternoon_start: midnight + Duration::minutes(AFTERNOON_START_MINUTE),
            afternoon_end: midnight + Duration::minutes(AFTERNOON_END_MINUTE),
        }
    }

    /// Strictly between morning end and afternoon start.
    pub fn in_lunch_break(&self, instant: NaiveDateTime) -> bool {
        self.morning_end < instant && instant < self.afternoon_start
    }

    /// Moves an instant out of the lunch break: starts resume at 13:30, ends
    /// fall back to 12:30. Instants outside the break are returned unchanged.
    pub fn snap_lunch(&self, instant: NaiveDateTime, edge: Edge) -> NaiveDateTime {
        if !self.in_lunch_break(instant) {
            return instant;
        }
        match edge {
            Edge::Start => self.afternoon_start,
            Edge::End => self.morning_end,
        }
    }

    /// Clamps an instant into the workday and snaps it out of the lunch break.
    pub fn clip(&self, instant: NaiveDateTime, edge: Edge) -> NaiveDateTime {
        if instant < self.morning_start {
            self.morning_start
        } else if instant > self.afternoon_end {
            self.afternoon_end
        } else {
            self.snap_lunch(instant, edge)
        }
    }

    /// Minutes from `start` to `end`, without the lunch hour when the span
    /// straddles it. Never negative.
    pub fn span_minutes(&self, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        let minutes = (end - start).num_minutes();
        let minutes = if start <= self.morning_end && end >= self.afternoon_start {
            minutes - LUNCH_BREAK_MINUTES
        } else {
            minutes
        };
        minutes.max(0)
    }
}

pub fn clip_to_workday(instant: NaiveDateTime, date: NaiveDate, edge: Edge) -> NaiveDateTime {
    WorkingWindow::for_date(date).clip(instant, edge)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Company holidays keyed by calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    dates: HashSet<NaiveDate>,
}

impl HolidaySet {
    pub fn from_holidays<'a>(holidays: impl IntoIterator<Item = &'a Holiday>) -> Self {
        Self {
            dates: holidays.into_iter().map(|h| h.date).collect(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.contains(date)
    }
}

/// Every date of the inclusive range, in order.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// Last representable second of the day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    Some((first, last))
}
