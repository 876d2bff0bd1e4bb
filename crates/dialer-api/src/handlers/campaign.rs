//! Campaign handlers

use crate::dto::{
    ApiResponse, CampaignListParams, CampaignResponse, CampaignStatusUpdateRequest,
    CampaignWindowResponse,
};
use actix_web::{web, HttpResponse};
use dialer_core::traits::{CampaignRepository, Repository};
use dialer_core::AppError;
use dialer_db::{PgAccountRepository, PgCampaignRepository};
use dialer_services::PgCallAllocator;
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// List an account's campaigns, newest first
///
/// GET /api/v1/campaigns?user_id=
#[instrument(skip(pool))]
pub async fn list_campaigns(
    pool: web::Data<PgPool>,
    query: web::Query<CampaignListParams>,
) -> Result<HttpResponse, AppError> {
    let campaigns = PgCampaignRepository::new(pool.get_ref().clone())
        .list_by_user(query.user_id)
        .await?;

    let data: Vec<CampaignResponse> = campaigns.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Pause, resume or complete a campaign
///
/// Only active campaigns yield dispatchable calls, so pausing takes effect
/// from the next allocation.
///
/// PUT /api/v1/campaigns/{id}/status
#[instrument(skip(pool, req))]
pub async fn update_campaign_status(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    req: web::Json<CampaignStatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let id = path.into_inner();
    let status = req.target()?;
    let updated = PgCampaignRepository::new(pool.get_ref().clone())
        .update_status(id, status)
        .await?;

    info!(%id, status = %updated.status, "Campaign status updated");

    Ok(HttpResponse::Ok().json(ApiResponse::success(CampaignResponse::from(updated))))
}

/// Effective timezone, local time and open/closed state of a campaign window
///
/// GET /api/v1/campaigns/{id}/window
#[instrument(skip(pool, allocator))]
pub async fn get_window(
    pool: web::Data<PgPool>,
    allocator: web::Data<PgCallAllocator>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = path.into_inner();
    debug!(%campaign_id, "Evaluating campaign window");

    let campaign = PgCampaignRepository::new(pool.get_ref().clone())
        .find_by_id(campaign_id)
        .await?
        .ok_or_else(|| AppError::CampaignNotFound(campaign_id.to_string()))?;

    let account = PgAccountRepository::new(pool.get_ref().clone())
        .find_by_id(campaign.user_id)
        .await?;
    let account_timezone = account.as_ref().and_then(|a| a.timezone());

    let response =
        CampaignWindowResponse::evaluate(&campaign, account_timezone, allocator.filter());
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Configure campaign routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/campaigns")
            .route("", web::get().to(list_campaigns))
            .route("/{id}/status", web::put().to(update_campaign_status))
            .route("/{id}/window", web::get().to(get_window)),
    );
}
