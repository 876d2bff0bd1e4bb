//! Queue DTOs
//!
//! Request and response types for call queue endpoints.

use chrono::{DateTime, Utc};
use dialer_core::models::{CallType, NewQueueEntry, QueueEntry, QueueStatus};
use dialer_core::traits::{PaginatedResponse, PaginationMeta, QueueStatusCounts};
use dialer_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Enqueue request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnqueueRequest {
    /// Owning account
    pub user_id: Uuid,

    /// `direct` or `campaign`
    #[serde(default = "default_call_type")]
    #[validate(length(min = 1, max = 20, message = "Call type is required"))]
    pub call_type: String,

    /// Required for campaign calls, forbidden for direct calls
    pub campaign_id: Option<Uuid>,

    /// Earliest dispatch instant, defaults to now
    pub scheduled_for: Option<DateTime<Utc>>,

    /// Higher dispatches first
    #[serde(default)]
    #[validate(range(min = -1000, max = 1000))]
    pub priority: i32,

    /// FIFO slot, next free slot when absent
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

fn default_call_type() -> String {
    "direct".to_string()
}

impl EnqueueRequest {
    /// Convert to a repository request, checking the call type / campaign pairing
    pub fn to_new_entry(&self) -> Result<NewQueueEntry, AppError> {
        let call_type = CallType::from_str(&self.call_type).ok_or_else(|| {
            AppError::Validation(format!("Unknown call type '{}'", self.call_type))
        })?;

        match (call_type, self.campaign_id) {
            (CallType::Campaign, None) => {
                return Err(AppError::Validation(
                    "campaign_id is required for campaign calls".to_string(),
                ))
            }
            (CallType::Direct, Some(_)) => {
                return Err(AppError::Validation(
                    "campaign_id is not allowed for direct calls".to_string(),
                ))
            }
            _ => {}
        }

        Ok(NewQueueEntry {
            user_id: self.user_id,
            call_type,
            campaign_id: self.campaign_id,
            scheduled_for: self.scheduled_for,
            priority: self.priority,
            position: self.position,
        })
    }
}

/// Query for listing an account's queue
///
/// GET /queue?user_id=&status=&page=&per_page=
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueueListParams {
    /// Account whose queue to list
    pub user_id: Uuid,

    /// Only entries in this status
    pub status: Option<String>,

    /// 1-indexed page
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,

    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 500))]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    100
}

impl QueueListParams {
    /// Parsed status filter
    pub fn status(&self) -> Result<Option<QueueStatus>, AppError> {
        self.status
            .as_deref()
            .map(|s| {
                QueueStatus::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", s)))
            })
            .transpose()
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Wrap one page of entries with its paging metadata
    pub fn paginate(
        &self,
        entries: Vec<QueueEntry>,
        total: i64,
    ) -> PaginatedResponse<QueueEntryResponse> {
        PaginatedResponse {
            data: entries.into_iter().map(Into::into).collect(),
            pagination: PaginationMeta::new(total, self.page, self.per_page),
        }
    }
}

/// Status write-back request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    /// New status
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

impl StatusUpdateRequest {
    /// Parsed target status
    pub fn target(&self) -> Result<QueueStatus, AppError> {
        QueueStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Validation(format!("Unknown status '{}'", self.status)))
    }
}

/// Queue entry response
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub call_type: String,
    pub campaign_id: Option<Uuid>,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub priority: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub last_system_allocation_at: Option<DateTime<Utc>>,
}

impl From<QueueEntry> for QueueEntryResponse {
    fn from(entry: QueueEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            call_type: entry.call_type.to_string(),
            campaign_id: entry.campaign_id,
            status: entry.status.to_string(),
            scheduled_for: entry.scheduled_for,
            priority: entry.priority,
            position: entry.position,
            created_at: entry.created_at,
            last_system_allocation_at: entry.last_system_allocation_at,
        }
    }
}

/// Per-status counts for one account
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatsResponse {
    pub user_id: Uuid,
    pub total: i64,
    #[serde(flatten)]
    pub counts: QueueStatusCounts,
}

impl QueueStatsResponse {
    pub fn new(user_id: Uuid, counts: QueueStatusCounts) -> Self {
        Self {
            user_id,
            total: counts.total(),
            counts,
        }
    }
}
