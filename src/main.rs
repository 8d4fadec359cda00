use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::Datelike;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod paid_leave;
mod ports;
mod routes;
mod scheduler;
mod store;
#[cfg(test)]
mod test_support;
mod timekeeping;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::paid_leave::{ContractStatusJob, PaidLeaveLedger};
use crate::store::MySqlStore;
use crate::timekeeping::{MonthlyAggregator, ScanReconciler};
use crate::utils::holiday_cache::HolidayCache;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM timekeeping service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    if config.run_migrations {
        db::run_migrations(&pool).await?;
        info!("Database migrations applied");
    }

    let store = Arc::new(MySqlStore::new(pool, config.zone));
    let holidays = Arc::new(HolidayCache::new(store.clone(), config.holiday_cache_ttl));
    let ports = crate::store::mysql::ports(&store, holidays.clone());

    let aggregator = MonthlyAggregator::new(ports.clone(), config.zone);
    let ledger = PaidLeaveLedger::new(ports, aggregator.clone(), config.ledger_batch_size);
    let reconciler = ScanReconciler::new(store.clone(), store.clone(), config.zone);
    let contract_job = ContractStatusJob::new(store.clone());

    let holidays_for_warmup = holidays.clone();
    let this_year = config.today().year();
    actix_web::rt::spawn(async move {
        if let Err(e) = holidays_for_warmup.warmup([this_year - 1, this_year]).await {
            warn!(error = ?e, "Failed to warmup holiday cache");
        }
    });

    // Settled months are skipped on rerun. Single process only.
    let ledger_for_job = ledger.clone();
    scheduler::spawn_daily(
        "paid_leave_ledger",
        config.ledger_job_at,
        config.zone,
        move |today| {
            let ledger = ledger_for_job.clone();
            async move {
                if let Err(e) = ledger.run_monthly_job(today).await {
                    error!(error = ?e, %today, "Paid leave ledger run failed");
                }
            }
        },
    );

    scheduler::spawn_daily(
        "contract_status",
        config.contract_job_at,
        config.zone,
        move |today| {
            let job = contract_job.clone();
            async move {
                job.refresh_contract_statuses(today).await;
            }
        },
    );

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let holidays_data = Data::from(holidays);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(aggregator.clone()))
            .app_data(Data::new(ledger.clone()))
            .app_data(Data::new(reconciler.clone()))
            .app_data(holidays_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
