use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use dotenvy::dotenv;

use crate::paid_leave::ledger::DEFAULT_BATCH_SIZE;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    /// Reference timezone of every wall-clock time the engine handles.
    pub zone: FixedOffset,
    pub ledger_batch_size: usize,
    pub ledger_job_at: NaiveTime,
    pub contract_job_at: NaiveTime,
    pub holiday_cache_ttl: Duration,
    pub run_migrations: bool,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let utc_offset_hours: i32 = var_or("UTC_OFFSET_HOURS", "7")?;
        let zone = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("UTC_OFFSET_HOURS out of range: {utc_offset_hours}"))?;

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            zone,
            ledger_batch_size: var_or("LEDGER_BATCH_SIZE", &DEFAULT_BATCH_SIZE.to_string())?,
            ledger_job_at: time_or("LEDGER_JOB_AT", "00:00")?,
            contract_job_at: time_or("CONTRACT_JOB_AT", "18:15")?,
            holiday_cache_ttl: Duration::from_secs(var_or("HOLIDAY_CACHE_TTL_SECS", "86400")?),
            run_migrations: var_or("RUN_MIGRATIONS", "false")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", "debug")?,
        })
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.zone).date_naive()
    }
}

#[cfg(test)]
impl Config {
    /// Defaults for handler tests; nothing here is ever connected to.
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://unused".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            rate_protected_per_min: 1000,
            zone: FixedOffset::east_opt(7 * 3600).unwrap(),
            ledger_batch_size: DEFAULT_BATCH_SIZE,
            ledger_job_at: NaiveTime::default(),
            contract_job_at: NaiveTime::default(),
            holiday_cache_ttl: Duration::from_secs(60),
            run_migrations: false,
            log_dir: "logs".into(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

fn var_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("invalid {key}: {raw:?}"))
}

fn time_or(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .with_context(|| format!("invalid {key}: {raw:?}, expected HH:MM"))
}
