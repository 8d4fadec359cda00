//! Error types shared by the engine and its storage adapters.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Query(String),

    /// A unique key rejected the write. For ledger rows this means the
    /// unprocessed-user partitioning let a user through twice.
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("malformed stored value: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        match e {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(e.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum TimekeepingError {
    #[error("leave interval ends at {end} which is not after its start {start}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("check-out {check_out} precedes check-in {check_in} on {date}")]
    CheckOutBeforeCheckIn {
        date: NaiveDate,
        check_in: NaiveDateTime,
        check_out: NaiveDateTime,
    },

    #[error("date range {start}..={end} is empty")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TimekeepingResult<T> = Result<T, TimekeepingError>;
