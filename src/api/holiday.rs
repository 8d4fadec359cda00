use actix_web::{HttpResponse, Responder, web};

use crate::utils::holiday_cache::HolidayCache;

/// Drop cached holidays so table edits apply immediately
#[utoipa::path(
    post,
    path = "/api/holidays/reload",
    responses(
        (status = 200, description = "Holiday cache cleared", body = Object, example = json!({
            "message": "Holiday cache reloaded"
        }))
    ),
    tag = "Holidays"
)]
pub async fn reload_holidays(cache: web::Data<HolidayCache>) -> impl Responder {
    cache.reload();
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Holiday cache reloaded"
    }))
}
