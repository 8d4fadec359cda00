pub mod contract_status;
pub mod ledger;

pub use contract_status::ContractStatusJob;
pub use ledger::{LedgerRunSummary, PaidLeaveLedger};
