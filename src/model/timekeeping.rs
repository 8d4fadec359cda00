use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row per user per calendar day, maintained by scan reconciliation.
///
/// `check_in`/`check_out` are wall-clock times in the reference timezone.
/// `id` is `None` until the record has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyRecord {
    #[schema(example = 42, nullable = true)]
    pub id: Option<u64>,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "2026-01-05")]
    pub date: NaiveDate,
    #[schema(example = "2026-01-05T08:55:00", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T18:02:00", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
}

