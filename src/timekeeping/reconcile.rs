//! Folds raw scanner events into one timekeeping record per user and day.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument};

use crate::error::TimekeepingResult;
use crate::model::{DailyRecord, ScanEvent};
use crate::ports::{TimekeepingLookup, TimekeepingWriter};

/// Earliest and latest scan of one user on one local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl ScanWindow {
    fn single(instant: NaiveDateTime) -> Self {
        Self {
            first: instant,
            last: instant,
        }
    }

    fn widen(&mut self, instant: NaiveDateTime) {
        self.first = self.first.min(instant);
        self.last = self.last.max(instant);
    }
}

/// Groups scans by user and by calendar day in `zone`.
pub fn group_scans(
    scans: &[ScanEvent],
    zone: &FixedOffset,
) -> BTreeMap<(u64, NaiveDate), ScanWindow> {
    let mut windows: BTreeMap<(u64, NaiveDate), ScanWindow> = BTreeMap::new();
    for scan in scans {
        let local = scan.timestamp.with_timezone(zone).naive_local();
        windows
            .entry((scan.user_id, local.date()))
            .and_modify(|w| w.widen(local))
            .or_insert_with(|| ScanWindow::single(local));
    }
    windows
}

/// Widens an existing record by a scan window. The record never narrows, so
/// feeding the same scans again changes nothing.
pub fn merge_window(
    user_id: u64,
    date: NaiveDate,
    existing: Option<&DailyRecord>,
    window: ScanWindow,
) -> DailyRecord {
    let known = existing
        .into_iter()
        .flat_map(|r| [r.check_in, r.check_out])
        .flatten();
    let mut merged = window;
    for instant in known {
        merged.widen(instant);
    }

    DailyRecord {
        id: existing.and_then(|r| r.id),
        user_id,
        date,
        check_in: Some(merged.first),
        check_out: (merged.last > merged.first).then_some(merged.last),
    }
}

#[derive(Clone)]
pub struct ScanReconciler {
    lookup: Arc<dyn TimekeepingLookup>,
    writer: Arc<dyn TimekeepingWriter>,
    zone: FixedOffset,
}

impl ScanReconciler {
    pub fn new(
        lookup: Arc<dyn TimekeepingLookup>,
        writer: Arc<dyn TimekeepingWriter>,
        zone: FixedOffset,
    ) -> Self {
        Self {
            lookup,
            writer,
            zone,
        }
    }

    /// Returns the resulting record of every touched (user, day), in that
    /// order. Records whose window did not change are not written.
    #[instrument(skip_all, fields(scans = scans.len()))]
    pub async fn reconcile_scans(&self, scans: &[ScanEvent]) -> TimekeepingResult<Vec<DailyRecord>> {
        let windows = group_scans(scans, &self.zone);

        let mut ranges: BTreeMap<u64, (NaiveDate, NaiveDate)> = BTreeMap::new();
        for &(user_id, date) in windows.keys() {
            ranges
                .entry(user_id)
                .and_modify(|(start, end)| {
                    *start = (*start).min(date);
                    *end = (*end).max(date);
                })
                .or_insert((date, date));
        }

        let mut records = Vec::with_capacity(windows.len());
        let mut written = 0usize;
        for (user_id, (start, end)) in ranges {
            let existing: HashMap<NaiveDate, DailyRecord> = self
                .lookup
                .get_by_user_and_range(user_id, start, end)
                .await?
                .into_iter()
                .map(|r| (r.date, r))
                .collect();

            for (&(_, date), window) in windows.range((user_id, start)..=(user_id, end)) {
                let current = existing.get(&date);
                let merged = merge_window(user_id, date, current, *window);
                if current == Some(&merged) {
                    records.push(merged);
                    continue;
                }
                debug!(user_id, %date, check_in = ?merged.check_in, check_out = ?merged.check_out, "timekeeping widened");
                records.push(self.writer.upsert_daily_record(&merged).await?);
                written += 1;
            }
        }

        info!(days = records.len(), written, "scan batch reconciled");
        Ok(records)
    }
}
