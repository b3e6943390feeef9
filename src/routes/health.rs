use actix_web::{get, HttpResponse};
use chrono::Utc;
use serde_json::json;

/// Liveness check. Public, touches no storage.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now()
    }))
}
