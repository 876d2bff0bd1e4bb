//! Dispatch DTOs

use chrono::{NaiveTime, Utc};
use dialer_core::models::{Campaign, QueueEntry};
use dialer_services::timezone::local_time_of_day;
use dialer_services::{CallWindow, EligibilityFilter};
use serde::Serialize;
use uuid::Uuid;

use super::queue::QueueEntryResponse;

/// Result of one allocation attempt
#[derive(Debug, Clone, Serialize)]
pub struct AllocateResponse {
    /// Whether a call was claimed
    pub allocated: bool,

    /// The claimed entry
    pub entry: Option<QueueEntryResponse>,
}

impl From<Option<QueueEntry>> for AllocateResponse {
    fn from(entry: Option<QueueEntry>) -> Self {
        Self {
            allocated: entry.is_some(),
            entry: entry.map(Into::into),
        }
    }
}

/// Calling window of a campaign as seen right now
#[derive(Debug, Clone, Serialize)]
pub struct CampaignWindowResponse {
    pub campaign_id: Uuid,
    pub status: String,
    pub effective_timezone: String,
    pub local_time: NaiveTime,
    pub first_call_time: NaiveTime,
    pub last_call_time: NaiveTime,
    pub crosses_midnight: bool,
    pub open: bool,
}

impl CampaignWindowResponse {
    /// Evaluate the window with the allocator's policy
    pub fn evaluate(
        campaign: &Campaign,
        account_timezone: Option<&str>,
        filter: &EligibilityFilter,
    ) -> Self {
        let timezone = filter
            .resolver()
            .effective_timezone(Some(campaign), account_timezone)
            .to_string();
        let local_time = local_time_of_day(&timezone, Utc::now());
        let window = CallWindow::for_campaign(campaign);

        Self {
            campaign_id: campaign.id,
            status: campaign.status.to_string(),
            effective_timezone: timezone,
            local_time,
            first_call_time: window.first,
            last_call_time: window.last,
            crosses_midnight: window.crosses_midnight(),
            open: campaign.status.is_dispatchable()
                && window.contains(local_time, filter.overnight_windows()),
        }
    }
}
