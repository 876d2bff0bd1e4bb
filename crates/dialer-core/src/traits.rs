//! Common traits for repositories and the allocation store
//!
//! Defines abstractions for database access. The allocation store is the seam
//! between the allocator and storage: every allocation runs inside one
//! `AllocationTx`, and nothing it wrote survives unless `commit` succeeds.

use crate::error::AppError;
use crate::models::{
    Account, Campaign, CampaignStatus, DispatchCandidate, NewQueueEntry, QueueEntry, QueueStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Generic read-only repository trait
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;
}

/// Call queue repository
#[async_trait]
pub trait QueueRepository: Repository<QueueEntry, Uuid> {
    /// Add a call to the queue, taking the account's next FIFO position
    /// when none is given
    async fn enqueue(&self, entry: &NewQueueEntry) -> Result<QueueEntry, AppError>;

    /// List an account's queue in static priority order: direct calls
    /// first, then priority descending, FIFO position, creation time.
    ///
    /// Campaign fairness and calling windows are not applied, so this is
    /// not the order `allocate_next` would hand entries out in.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<QueueStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<QueueEntry>, i64), AppError>;

    /// Count an account's entries per status
    async fn status_counts(&self, user_id: Uuid) -> Result<QueueStatusCounts, AppError>;

    /// Dispatch-loop write-back of a terminal status.
    ///
    /// Never touches `last_system_allocation_at`.
    async fn update_status(&self, id: Uuid, status: QueueStatus) -> Result<QueueEntry, AppError>;
}

/// Campaign repository
#[async_trait]
pub trait CampaignRepository: Repository<Campaign, Uuid> {
    /// List campaigns owned by an account
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Campaign>, AppError>;

    /// Change campaign status
    async fn update_status(&self, id: Uuid, status: CampaignStatus) -> Result<Campaign, AppError>;
}

/// Account repository
#[async_trait]
pub trait AccountRepository: Repository<Account, Uuid> {
    /// Set the account default timezone
    async fn update_timezone(&self, id: Uuid, timezone: &str) -> Result<Account, AppError>;
}

/// Opens allocation transactions against the shared queue store
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Transaction type handed to the allocator
    type Tx: AllocationTx;

    /// Begin an allocation transaction scoped to one account
    async fn begin(&self, user_id: Uuid) -> Result<Self::Tx, AppError>;
}

/// A single select-and-stamp unit of work
///
/// Dropping the transaction without calling `commit` discards all claims.
#[async_trait]
pub trait AllocationTx: Send {
    /// Queued, due rows for the account whose campaign (if any) is active
    async fn candidates(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<DispatchCandidate>, AppError>;

    /// Conditionally move a row from `queued` to `allocated`, stamping
    /// `last_system_allocation_at` (and the campaign's `last_served_at`).
    ///
    /// Returns `None` when the row is no longer queued.
    async fn claim(
        &mut self,
        candidate: &DispatchCandidate,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, AppError>;

    /// Make the claims visible to everyone else
    async fn commit(self) -> Result<(), AppError>;
}

/// Per-status queue counts for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatusCounts {
    pub queued: i64,
    pub allocated: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub failed: i64,
}

impl QueueStatusCounts {
    /// Add `count` rows of `status`
    pub fn add(&mut self, status: QueueStatus, count: i64) {
        match status {
            QueueStatus::Queued => self.queued += count,
            QueueStatus::Allocated => self.allocated += count,
            QueueStatus::Completed => self.completed += count,
            QueueStatus::Cancelled => self.cancelled += count,
            QueueStatus::Failed => self.failed += count,
        }
    }

    /// Total rows across every status
    pub fn total(&self) -> i64 {
        self.queued + self.allocated + self.completed + self.cancelled + self.failed
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta() {
        assert_eq!(PaginationMeta::new(95, 1, 10).total_pages, 10);
        assert_eq!(PaginationMeta::new(101, 1, 10).total_pages, 11);
        assert_eq!(PaginationMeta::new(5, 1, 0).total_pages, 0);
    }

    #[test]
    fn test_status_counts() {
        let mut counts = QueueStatusCounts::default();
        counts.add(QueueStatus::Queued, 4);
        counts.add(QueueStatus::Allocated, 1);
        counts.add(QueueStatus::Failed, 2);
        counts.add(QueueStatus::Queued, 1);

        assert_eq!(counts.queued, 5);
        assert_eq!(counts.allocated, 1);
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.total(), 8);
    }
}
