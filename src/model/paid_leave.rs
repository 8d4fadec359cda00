use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One month of the paid-leave ledger. Rows are appended, never rewritten.
///
/// `hours_left` is the balance carried into the following month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaidLeaveSnapshot {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 46.0)]
    pub hours_left: f64,
    #[schema(example = 10.0)]
    pub hours_used: f64,
}
