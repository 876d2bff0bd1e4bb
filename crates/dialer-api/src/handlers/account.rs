//! Account handlers

use crate::dto::{AccountResponse, ApiResponse, TimezoneUpdateRequest};
use actix_web::{web, HttpResponse};
use dialer_core::traits::AccountRepository;
use dialer_core::AppError;
use dialer_db::PgAccountRepository;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Set the default timezone used by campaigns without an override
///
/// Unknown IANA names are rejected with `invalid_timezone`.
///
/// PUT /api/v1/accounts/{id}/timezone
#[instrument(skip(pool, req))]
pub async fn update_timezone(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    req: web::Json<TimezoneUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Timezone update validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let id = path.into_inner();
    let account = PgAccountRepository::new(pool.get_ref().clone())
        .update_timezone(id, &req.timezone)
        .await?;

    info!(%id, timezone = ?account.timezone, "Account timezone updated");

    Ok(HttpResponse::Ok().json(ApiResponse::success(AccountResponse::from(account))))
}

/// Configure account routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/accounts").route("/{id}/timezone", web::put().to(update_timezone)));
}
