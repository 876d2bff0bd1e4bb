//! Campaign model
//!
//! A calling campaign owned by an account, with the local time-of-day window
//! its queued calls may be dispatched in.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Campaign status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Running, its queue entries may be dispatched
    #[default]
    Active,
    /// Temporarily halted
    Paused,
    /// Finished its contact list
    Completed,
    /// Stopped for good
    Cancelled,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl CampaignStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            "cancelled" => Some(CampaignStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if the campaign can yield dispatchable calls
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, CampaignStatus::Active)
    }
}

/// Campaign entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier
    pub id: Uuid,

    /// Owning account
    pub user_id: Uuid,

    /// Display name
    pub name: String,

    /// Current status
    pub status: CampaignStatus,

    /// Whether `campaign_timezone` overrides the account timezone
    pub use_custom_timezone: bool,

    /// IANA zone name, only meaningful with `use_custom_timezone`
    pub campaign_timezone: Option<String>,

    /// Start of the local calling window
    pub first_call_time: NaiveTime,

    /// End of the local calling window (inclusive)
    pub last_call_time: NaiveTime,

    /// Last time one of this campaign's calls was allocated
    pub last_served_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// The campaign's own timezone override, if it carries a usable one
    pub fn timezone_override(&self) -> Option<&str> {
        if !self.use_custom_timezone {
            return None;
        }
        self.campaign_timezone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
    }
}

impl Default for Campaign {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: String::new(),
            status: CampaignStatus::Active,
            use_custom_timezone: false,
            campaign_timezone: None,
            first_call_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            last_call_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            last_served_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
