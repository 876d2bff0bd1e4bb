//! Health check handler

use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use tracing::warn;

/// Liveness plus a database round trip
///
/// GET /api/v1/health
pub async fn health_check(pool: web::Data<PgPool>) -> HttpResponse {
    let database = match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => "up",
        Err(e) => {
            warn!("Health check database query failed: {}", e);
            "down"
        }
    };

    let body = serde_json::json!({
        "status": if database == "up" { "healthy" } else { "degraded" },
        "service": "dialer-dispatch",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    });

    if database == "up" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
