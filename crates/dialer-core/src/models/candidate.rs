//! Dispatch candidate
//!
//! A queued entry joined with the configuration the scheduler needs to judge
//! it: the owning campaign (for campaign calls) and the account timezone.

use serde::{Deserialize, Serialize};

use super::{Campaign, QueueEntry};

/// Snapshot row handed to the allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCandidate {
    /// The queued row
    pub entry: QueueEntry,

    /// Owning campaign, `None` for direct calls
    pub campaign: Option<Campaign>,

    /// Account default timezone
    pub account_timezone: Option<String>,
}

impl DispatchCandidate {
    /// Build a candidate for a direct call
    pub fn direct(entry: QueueEntry, account_timezone: Option<String>) -> Self {
        Self {
            entry,
            campaign: None,
            account_timezone,
        }
    }

    /// Build a candidate for a campaign call
    pub fn campaign(entry: QueueEntry, campaign: Campaign, account_timezone: Option<String>) -> Self {
        Self {
            entry,
            campaign: Some(campaign),
            account_timezone,
        }
    }
}
