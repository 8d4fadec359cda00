//! Daily background jobs pinned to the reference timezone.

use std::future::Future;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::info;

/// The first `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Runs `task` every day at `at` (wall-clock in `zone`) on the actix runtime,
/// passing it the local date of the run.
pub fn spawn_daily<F, Fut>(name: &'static str, at: NaiveTime, zone: FixedOffset, mut task: F)
where
    F: FnMut(NaiveDate) -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    actix_web::rt::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&zone).naive_local();
            let next = next_run_after(now, at);
            info!(job = name, next_run = %next, "job scheduled");

            actix_web::rt::time::sleep((next - now).to_std().unwrap_or_default()).await;
            task(next.date()).await;
        }
    });
}
