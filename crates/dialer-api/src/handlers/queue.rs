//! Queue handlers
//!
//! HTTP handlers for adding calls to the queue, inspecting it, and writing
//! back the outcome of allocated calls.

use crate::dto::{
    ApiResponse, EnqueueRequest, QueueEntryResponse, QueueListParams, QueueStatsResponse,
    StatusUpdateRequest,
};
use actix_web::{web, HttpResponse};
use dialer_core::traits::{QueueRepository, Repository};
use dialer_core::AppError;
use dialer_db::PgQueueRepository;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Add a call to the queue
///
/// POST /api/v1/queue
#[instrument(skip(pool, req))]
pub async fn enqueue(
    pool: web::Data<PgPool>,
    req: web::Json<EnqueueRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Enqueue validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let new_entry = req.to_new_entry()?;
    let repo = PgQueueRepository::new(pool.get_ref().clone());
    let created = repo.enqueue(&new_entry).await?;

    info!(
        id = %created.id,
        user_id = %created.user_id,
        call_type = %created.call_type,
        "Call queued"
    );

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        QueueEntryResponse::from(created),
        "Call queued successfully",
    )))
}

/// List an account's queue, direct calls first then by priority and FIFO slot
///
/// GET /api/v1/queue?user_id=&status=&page=&per_page=
#[instrument(skip(pool))]
pub async fn list_queue(
    pool: web::Data<PgPool>,
    query: web::Query<QueueListParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Queue listing validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let status = query.status()?;
    debug!(
        user_id = %query.user_id,
        page = query.page,
        per_page = query.per_page,
        "Listing queue"
    );

    let repo = PgQueueRepository::new(pool.get_ref().clone());
    let (entries, total) = repo
        .list_by_user(query.user_id, status, query.limit(), query.offset())
        .await?;

    Ok(HttpResponse::Ok().json(query.paginate(entries, total)))
}

/// Get a single queue entry
///
/// GET /api/v1/queue/{id}
#[instrument(skip(pool))]
pub async fn get_entry(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let repo = PgQueueRepository::new(pool.get_ref().clone());
    let entry = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::QueueEntryNotFound(id.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(QueueEntryResponse::from(entry))))
}

/// Write back the outcome of a call
///
/// PUT /api/v1/queue/{id}/status
#[instrument(skip(pool, req))]
pub async fn update_status(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    req: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let id = path.into_inner();
    let status = req.target()?;
    let repo = PgQueueRepository::new(pool.get_ref().clone());
    let updated = repo.update_status(id, status).await?;

    info!(%id, status = %updated.status, "Queue entry status updated");

    Ok(HttpResponse::Ok().json(ApiResponse::success(QueueEntryResponse::from(updated))))
}

/// Per-status counts for an account
///
/// GET /api/v1/queue/stats/{user_id}
#[instrument(skip(pool))]
pub async fn queue_stats(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let repo = PgQueueRepository::new(pool.get_ref().clone());
    let counts = repo.status_counts(user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(QueueStatsResponse::new(
        user_id, counts,
    ))))
}

/// Configure queue routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/queue")
            .route("", web::post().to(enqueue))
            .route("", web::get().to(list_queue))
            .route("/stats/{user_id}", web::get().to(queue_stats))
            .route("/{id}", web::get().to(get_entry))
            .route("/{id}/status", web::put().to(update_status)),
    );
}
