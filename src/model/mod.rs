pub mod contract;
pub mod holiday;
pub mod leave_request;
pub mod paid_leave;
pub mod scan_event;
pub mod timekeeping;

pub use contract::{Contract, ContractStatus, ContractType};
pub use holiday::Holiday;
pub use leave_request::{LeaveInterval, LeaveRequest, LeaveStatus};
pub use paid_leave::PaidLeaveSnapshot;
pub use scan_event::ScanEvent;
pub use timekeeping::DailyRecord;
