//! Call queue entry model
//!
//! One pending or completed call-dispatch request. The allocator only ever
//! performs the `queued -> allocated` transition; terminal states are written
//! back by the dispatch loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of call a queue entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// One-off call not tied to a campaign; always dispatched before campaign calls
    Direct,
    /// Call generated from a campaign contact list; subject to the calling window
    Campaign,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallType::Direct => write!(f, "direct"),
            CallType::Campaign => write!(f, "campaign"),
        }
    }
}

impl CallType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Some(CallType::Direct),
            "campaign" => Some(CallType::Campaign),
            _ => None,
        }
    }
}

/// Queue entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting to be picked by the allocator
    #[default]
    Queued,
    /// Claimed by the allocator, handed to the dispatch loop
    Allocated,
    /// Call placed and finished
    Completed,
    /// Withdrawn before completion
    Cancelled,
    /// Call attempt failed
    Failed,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueueStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Allocated => "allocated",
            QueueStatus::Completed => "completed",
            QueueStatus::Cancelled => "cancelled",
            QueueStatus::Failed => "failed",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Some(QueueStatus::Queued),
            "allocated" => Some(QueueStatus::Allocated),
            "completed" => Some(QueueStatus::Completed),
            "cancelled" => Some(QueueStatus::Cancelled),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Completed | QueueStatus::Cancelled | QueueStatus::Failed
        )
    }

    /// Transitions the dispatch loop is allowed to write back.
    ///
    /// `queued -> allocated` is reserved for the allocator and is rejected here.
    pub fn can_write_back(&self, next: QueueStatus) -> bool {
        match (self, next) {
            (QueueStatus::Queued, QueueStatus::Cancelled) => true,
            (QueueStatus::Allocated, next) => next.is_terminal(),
            _ => false,
        }
    }
}

/// Call queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique identifier
    pub id: Uuid,

    /// Owning account
    pub user_id: Uuid,

    /// Direct or campaign call
    pub call_type: CallType,

    /// Owning campaign, present iff `call_type` is `Campaign`
    pub campaign_id: Option<Uuid>,

    /// Current status
    pub status: QueueStatus,

    /// Not eligible before this instant
    pub scheduled_for: DateTime<Utc>,

    /// Higher dispatches first within the call-type class
    pub priority: i32,

    /// FIFO tiebreak, lower dispatches first
    pub position: i32,

    /// Creation timestamp, final tiebreak
    pub created_at: DateTime<Utc>,

    /// Last time the allocator picked this row
    pub last_system_allocation_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Create a queued direct call
    pub fn direct(user_id: Uuid, priority: i32, position: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            call_type: CallType::Direct,
            campaign_id: None,
            status: QueueStatus::Queued,
            scheduled_for: now,
            priority,
            position,
            created_at: now,
            last_system_allocation_at: None,
        }
    }

    /// Create a queued campaign call
    pub fn campaign(user_id: Uuid, campaign_id: Uuid, priority: i32, position: i32) -> Self {
        Self {
            call_type: CallType::Campaign,
            campaign_id: Some(campaign_id),
            ..Self::direct(user_id, priority, position)
        }
    }

    /// Check if this is a direct call
    pub fn is_direct(&self) -> bool {
        self.call_type == CallType::Direct
    }

    /// Check if the scheduled time has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for <= now
    }

    /// Check the call-type / campaign pairing
    pub fn has_consistent_campaign(&self) -> bool {
        match self.call_type {
            CallType::Direct => self.campaign_id.is_none(),
            CallType::Campaign => self.campaign_id.is_some(),
        }
    }
}

/// Request to add a call to the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQueueEntry {
    pub user_id: Uuid,
    pub call_type: CallType,
    pub campaign_id: Option<Uuid>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub priority: i32,
    /// Assigned as the next FIFO slot for the account when absent
    pub position: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            QueueStatus::Queued,
            QueueStatus::Allocated,
            QueueStatus::Completed,
            QueueStatus::Cancelled,
            QueueStatus::Failed,
        ] {
            assert_eq!(QueueStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(QueueStatus::from_str("ALLOCATED"), Some(QueueStatus::Allocated));
        assert_eq!(QueueStatus::from_str("ringing"), None);
    }

    #[test]
    fn test_write_back_transitions() {
        assert!(QueueStatus::Allocated.can_write_back(QueueStatus::Completed));
        assert!(QueueStatus::Allocated.can_write_back(QueueStatus::Failed));
        assert!(QueueStatus::Allocated.can_write_back(QueueStatus::Cancelled));
        assert!(QueueStatus::Queued.can_write_back(QueueStatus::Cancelled));

        assert!(!QueueStatus::Queued.can_write_back(QueueStatus::Allocated));
        assert!(!QueueStatus::Queued.can_write_back(QueueStatus::Completed));
        assert!(!QueueStatus::Completed.can_write_back(QueueStatus::Failed));
        assert!(!QueueStatus::Allocated.can_write_back(QueueStatus::Queued));
    }

    #[test]
    fn test_campaign_pairing() {
        let user = Uuid::new_v4();
        let direct = QueueEntry::direct(user, 0, 1);
        assert!(direct.is_direct());
        assert!(direct.has_consistent_campaign());

        let mut campaign = QueueEntry::campaign(user, Uuid::new_v4(), 0, 2);
        assert!(!campaign.is_direct());
        assert!(campaign.has_consistent_campaign());

        campaign.campaign_id = None;
        assert!(!campaign.has_consistent_campaign());
    }

    #[test]
    fn test_is_due() {
        let mut entry = QueueEntry::direct(Uuid::new_v4(), 0, 1);
        let now = entry.scheduled_for;
        assert!(entry.is_due(now));

        entry.scheduled_for = now + Duration::seconds(1);
        assert!(!entry.is_due(now));
    }
}
