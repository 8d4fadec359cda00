pub mod aggregator;
pub mod calendar;
pub mod reconcile;
pub mod working_hours;

pub use aggregator::{MonthlyAggregator, MonthlyReport};
pub use reconcile::ScanReconciler;
pub use working_hours::{DailyHours, DayAttendance};
