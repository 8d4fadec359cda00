use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single finger-scanner hit, already normalized from the device feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanEvent {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "2026-01-05T01:55:00Z")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "dev-01/000123", nullable = true)]
    pub raw_id: Option<String>,
}
