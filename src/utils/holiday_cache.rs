use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use moka::future::Cache;

use crate::error::StoreError;
use crate::model::Holiday;
use crate::ports::HolidayLookup;

/// Company holidays cached per calendar year in front of the store.
///
/// Built once at startup and injected; `reload` drops every cached year so
/// edits to the holiday table show up on the next lookup.
pub struct HolidayCache {
    source: Arc<dyn HolidayLookup>,
    years: Cache<i32, Arc<Vec<Holiday>>>,
}

impl HolidayCache {
    pub fn new(source: Arc<dyn HolidayLookup>, ttl: Duration) -> Self {
        Self {
            source,
            years: Cache::builder()
                .max_capacity(64) // a year per entry
                .time_to_live(ttl)
                .build(),
        }
    }

    async fn year(&self, year: i32) -> Result<Arc<Vec<Holiday>>, StoreError> {
        self.years
            .try_get_with(year, async {
                let (first, last) = NaiveDate::from_ymd_opt(year, 1, 1)
                    .zip(NaiveDate::from_ymd_opt(year, 12, 31))
                    .ok_or_else(|| StoreError::Query(format!("year {year} out of range")))?;
                self.source.list_in_range(first, last).await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Load the given years up front.
    pub async fn warmup(&self, years: impl IntoIterator<Item = i32>) -> Result<()> {
        let mut total_count = 0usize;
        for year in years {
            total_count += self.year(year).await?.len();
        }

        tracing::info!(holidays = total_count, "holiday cache warmup complete");
        Ok(())
    }

    pub fn reload(&self) {
        self.years.invalidate_all();
        tracing::info!("holiday cache invalidated");
    }
}

#[async_trait]
impl HolidayLookup for HolidayCache {
    async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        let mut holidays = Vec::new();
        for year in start.year()..=end.year() {
            holidays.extend(
                self.year(year)
                    .await?
                    .iter()
                    .filter(|h| (start..=end).contains(&h.date))
                    .cloned(),
            );
        }
        Ok(holidays)
    }
}
