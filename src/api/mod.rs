pub mod holiday;
pub mod paid_leave;
pub mod timekeeping;
