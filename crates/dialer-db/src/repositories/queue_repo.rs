//! Call queue repository implementation
//!
//! Provides PostgreSQL-backed storage for queue entries: enqueueing, listing,
//! and the dispatch loop's terminal status write-back.
//! Allocation itself lives in `PgAllocationStore`.

use chrono::{DateTime, Utc};
use dialer_core::{
    models::{CallType, NewQueueEntry, QueueEntry, QueueStatus},
    traits::{QueueRepository, QueueStatusCounts, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of QueueRepository
pub struct PgQueueRepository {
    pool: PgPool,
}

impl PgQueueRepository {
    /// Create a new queue repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse queue status from string
    fn parse_status(s: &str) -> QueueStatus {
        QueueStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown queue status '{}', treating as failed", s);
            QueueStatus::Failed
        })
    }

    /// Parse call type, falling back on the campaign reference
    fn parse_call_type(s: &str, campaign_id: Option<Uuid>) -> CallType {
        CallType::from_str(s).unwrap_or(if campaign_id.is_some() {
            CallType::Campaign
        } else {
            CallType::Direct
        })
    }
}

#[async_trait]
impl Repository<QueueEntry, Uuid> for PgQueueRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QueueEntry>> {
        debug!("Finding queue entry by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            SELECT
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            FROM call_queue
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding queue entry {}: {}", id, e);
            AppError::Database(format!("Failed to find queue entry: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<QueueEntry>> {
        debug!(
            "Finding all queue entries with limit {} offset {}",
            limit, offset
        );

        let rows = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            SELECT
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            FROM call_queue
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding queue entries: {}", e);
            AppError::Database(format!("Failed to fetch queue entries: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM call_queue")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting queue entries: {}", e);
                AppError::Database(format!("Failed to count queue entries: {}", e))
            })?;

        Ok(result.0)
    }
}

#[async_trait]
impl QueueRepository for PgQueueRepository {
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, call_type = %entry.call_type))]
    async fn enqueue(&self, entry: &NewQueueEntry) -> AppResult<QueueEntry> {
        match (entry.call_type, entry.campaign_id) {
            (CallType::Direct, Some(_)) => {
                return Err(AppError::InvalidInput(
                    "direct calls cannot reference a campaign".to_string(),
                ))
            }
            (CallType::Campaign, None) => {
                return Err(AppError::InvalidInput(
                    "campaign calls require campaign_id".to_string(),
                ))
            }
            _ => {}
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Serializes enqueues per account so the MAX(position) + 1 read below
        // cannot hand two entries the same slot.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(entry.user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to lock account {}: {}", entry.user_id, e);
                    AppError::Database(format!("Failed to lock account: {}", e))
                })?;
        if locked.is_none() {
            return Err(AppError::AccountNotFound(entry.user_id.to_string()));
        }

        if let Some(campaign_id) = entry.campaign_id {
            let owner: Option<Uuid> =
                sqlx::query_scalar("SELECT user_id FROM campaigns WHERE id = $1")
                    .bind(campaign_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| {
                        error!("Database error looking up campaign {}: {}", campaign_id, e);
                        AppError::Database(format!("Failed to look up campaign: {}", e))
                    })?;

            match owner {
                None => return Err(AppError::CampaignNotFound(campaign_id.to_string())),
                Some(owner) if owner != entry.user_id => {
                    return Err(AppError::InvalidInput(format!(
                        "campaign {} does not belong to account {}",
                        campaign_id, entry.user_id
                    )))
                }
                Some(_) => {}
            }
        }

        let row = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            INSERT INTO call_queue (
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position
            )
            VALUES (
                $1, $2, $3, $4, 'queued',
                COALESCE($5, NOW()), $6,
                COALESCE($7, (
                    SELECT COALESCE(MAX(position), 0) + 1
                    FROM call_queue
                    WHERE user_id = $2
                ))
            )
            RETURNING
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.call_type.to_string())
        .bind(entry.campaign_id)
        .bind(entry.scheduled_for)
        .bind(entry.priority)
        .bind(entry.position)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error enqueueing call: {}", e);
            AppError::Database(format!("Failed to enqueue call: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        let created: QueueEntry = row.into();
        info!(
            "Enqueued {} call {} at position {}",
            created.call_type, created.id, created.position
        );

        Ok(created)
    }

    /// Static priority order only; fairness keys depend on campaign stamps
    /// and the allocator's scope, so they are left to `allocate_next`.
    #[instrument(skip(self))]
    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<QueueStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<QueueEntry>, i64)> {
        debug!("Listing queue for account {} (status {:?})", user_id, status);

        let status = status.map(|s| s.as_str());

        let rows = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            SELECT
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            FROM call_queue
            WHERE user_id = $1
                AND ($2::text IS NULL OR status = $2)
            ORDER BY
                (call_type = 'direct') DESC,
                priority DESC,
                position ASC,
                created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing queue for {}: {}", user_id, e);
            AppError::Database(format!("Failed to list queue: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM call_queue
            WHERE user_id = $1
                AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting queue for {}: {}", user_id, e);
            AppError::Database(format!("Failed to count queue: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn status_counts(&self, user_id: Uuid) -> AppResult<QueueStatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM call_queue
            WHERE user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting queue statuses: {}", e);
            AppError::Database(format!("Failed to count queue statuses: {}", e))
        })?;

        let mut counts = QueueStatusCounts::default();
        for (status, count) in rows {
            counts.add(Self::parse_status(&status), count);
        }

        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: QueueStatus) -> AppResult<QueueEntry> {
        debug!("Writing back status {} for queue entry {}", status, id);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM call_queue WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to lock queue entry {}: {}", id, e);
                    AppError::Database(format!("Failed to lock queue entry: {}", e))
                })?
                .ok_or_else(|| AppError::QueueEntryNotFound(id.to_string()))?;

        let current = Self::parse_status(&current);
        if !current.can_write_back(status) {
            return Err(AppError::InvalidStatusTransition {
                from: current.to_string(),
                to: status.to_string(),
            });
        }

        let row = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            UPDATE call_queue
            SET status = $2
            WHERE id = $1
            RETURNING
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error updating queue entry status: {}", e);
            AppError::Database(format!("Failed to update queue entry status: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) call_type: String,
    pub(crate) campaign_id: Option<Uuid>,
    pub(crate) status: String,
    pub(crate) scheduled_for: DateTime<Utc>,
    pub(crate) priority: i32,
    pub(crate) position: i32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_system_allocation_at: Option<DateTime<Utc>>,
}

impl From<QueueRow> for QueueEntry {
    fn from(row: QueueRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            call_type: PgQueueRepository::parse_call_type(&row.call_type, row.campaign_id),
            campaign_id: row.campaign_id,
            status: PgQueueRepository::parse_status(&row.status),
            scheduled_for: row.scheduled_for,
            priority: row.priority,
            position: row.position,
            created_at: row.created_at,
            last_system_allocation_at: row.last_system_allocation_at,
        }
    }
}
