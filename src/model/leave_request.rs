use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub status: LeaveStatus,
    pub reason: Option<String>,
}

impl LeaveRequest {
    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }
}

/// The part of an approved leave request that falls on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaveInterval {
    #[schema(example = "2026-01-05T09:00:00")]
    pub start_at: NaiveDateTime,
    #[schema(example = "2026-01-05T12:30:00")]
    pub end_at: NaiveDateTime,
}

impl LeaveInterval {
    pub fn new(start_at: NaiveDateTime, end_at: NaiveDateTime) -> Self {
        Self { start_at, end_at }
    }

    /// Strict containment, the way check-in/out displacement is decided.
    pub fn strictly_contains(&self, instant: NaiveDateTime) -> bool {
        self.start_at < instant && instant < self.end_at
    }
}
