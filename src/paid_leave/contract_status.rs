//! Daily contract lifecycle transitions. Accrual reads only ACTIVE
//! contracts, so this keeps the ledger's view of contracts current.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::ports::ContractMaintenance;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContractStatusChanges {
    /// None when the update failed.
    pub activated: Option<u64>,
    pub expired: Option<u64>,
}

#[derive(Clone)]
pub struct ContractStatusJob {
    contracts: Arc<dyn ContractMaintenance>,
}

impl ContractStatusJob {
    pub fn new(contracts: Arc<dyn ContractMaintenance>) -> Self {
        Self { contracts }
    }

    /// Both transitions run independently; one failing does not hold back
    /// the other.
    #[instrument(skip(self))]
    pub async fn refresh_contract_statuses(&self, today: NaiveDate) -> ContractStatusChanges {
        let (activated, expired) = futures::join!(
            self.contracts.activate_due(today),
            self.contracts.expire_overdue(today),
        );

        let activated = activated
            .inspect_err(|e| error!(error = %e, %today, "activating due contracts failed"))
            .ok();
        let expired = expired
            .inspect_err(|e| error!(error = %e, %today, "expiring overdue contracts failed"))
            .ok();

        info!(?activated, ?expired, %today, "contract statuses refreshed");
        ContractStatusChanges { activated, expired }
    }
}
