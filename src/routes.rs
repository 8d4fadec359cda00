use crate::{
    api::{holiday, paid_leave, timekeeping},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

// Helper to build a per-scope limiter
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / requests_per_min as u64;
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let scope = web::scope(&config.api_prefix)
        .service(
            web::scope("/timekeeping")
                // /timekeeping/scans
                .service(web::resource("/scans").route(web::post().to(timekeeping::ingest_scans)))
                // /timekeeping/{user_id}
                .service(
                    web::resource("/{user_id}")
                        .route(web::get().to(timekeeping::get_monthly_report)),
                ),
        )
        .service(
            web::scope("/paid-leave")
                // /paid-leave/run
                .service(web::resource("/run").route(web::post().to(paid_leave::run_ledger)))
                // /paid-leave/{user_id}/history
                .service(
                    web::resource("/{user_id}/history")
                        .route(web::get().to(paid_leave::get_history)),
                )
                // /paid-leave/{user_id}/balance
                .service(
                    web::resource("/{user_id}/balance")
                        .route(web::get().to(paid_leave::get_balance)),
                ),
        )
        .service(
            web::scope("/holidays")
                .service(web::resource("/reload").route(web::post().to(holiday::reload_holidays))),
        );

    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => cfg.service(scope.wrap(Arc::new(limiter))),
        None => {
            tracing::warn!(
                rate = config.rate_protected_per_min,
                "rate limiter rejected its configuration, serving without it"
            );
            cfg.service(scope)
        }
    };
}
