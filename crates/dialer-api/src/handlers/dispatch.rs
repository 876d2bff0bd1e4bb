//! Dispatch handlers
//!
//! Entry point for the dialer loop: one call per request.

use crate::dto::AllocateResponse;
use actix_web::{web, HttpResponse};
use dialer_core::AppError;
use dialer_services::PgCallAllocator;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Allocate the next eligible call for an account
///
/// POST /api/v1/dispatch/{user_id}/allocate
///
/// Responds 200 with `allocated: false` when there is nothing to dial.
#[instrument(skip(allocator))]
pub async fn allocate_next(
    allocator: web::Data<PgCallAllocator>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let entry = allocator.allocate_next(user_id).await?;

    if entry.is_none() {
        debug!(%user_id, "Nothing to allocate");
    }

    Ok(HttpResponse::Ok().json(AllocateResponse::from(entry)))
}

/// Configure dispatch routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dispatch").route("/{user_id}/allocate", web::post().to(allocate_next)),
    );
}
