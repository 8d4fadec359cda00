use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::timekeeping::calendar::WORKING_HOURS_PER_DAY;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractStatus {
    AboutToActive,
    Active,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractType {
    #[schema(example = "Full-time")]
    pub name: String,
    /// Paid-leave days credited for every month the contract is active.
    #[schema(example = 1.0)]
    pub paid_leave_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Contract {
    pub id: u64,
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub contract_type: ContractType,
}

impl Contract {
    pub fn monthly_paid_leave_hours(&self) -> f64 {
        self.contract_type.paid_leave_days * WORKING_HOURS_PER_DAY
    }

    /// True when the contract already ran on `date`.
    pub fn started_by(&self, date: NaiveDate) -> bool {
        self.start_date <= date
    }
}
