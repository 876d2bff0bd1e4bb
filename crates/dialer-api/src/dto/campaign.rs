//! Campaign DTOs

use chrono::{DateTime, NaiveTime, Utc};
use dialer_core::models::{Campaign, CampaignStatus};
use dialer_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// GET /campaigns?user_id=
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignListParams {
    pub user_id: Uuid,
}

/// Pause, resume or complete a campaign
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CampaignStatusUpdateRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

impl CampaignStatusUpdateRequest {
    /// Parsed target status
    ///
    /// Unlike stored rows, an unknown value here is rejected rather than
    /// read as paused.
    pub fn target(&self) -> Result<CampaignStatus, AppError> {
        CampaignStatus::from_str(self.status.trim())
            .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", self.status)))
    }
}

/// Campaign response
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: String,
    pub use_custom_timezone: bool,
    pub campaign_timezone: Option<String>,
    pub first_call_time: NaiveTime,
    pub last_call_time: NaiveTime,
    pub last_served_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            user_id: campaign.user_id,
            name: campaign.name,
            status: campaign.status.to_string(),
            use_custom_timezone: campaign.use_custom_timezone,
            campaign_timezone: campaign.campaign_timezone,
            first_call_time: campaign.first_call_time,
            last_call_time: campaign.last_call_time,
            last_served_at: campaign.last_served_at,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        }
    }
}
