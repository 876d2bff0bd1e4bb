//! Transactional allocation store
//!
//! Each allocation runs in one sqlx transaction: read the account's candidate
//! snapshot, then claim a row with a conditional update
//! (`... WHERE id = $1 AND status = 'queued' RETURNING ...`). Under READ
//! COMMITTED a second transaction racing for the same row blocks on the row
//! lock, re-evaluates the predicate after the first commits, and gets no row
//! back. Every query is filtered by `user_id`, so allocations for different
//! accounts never touch the same rows.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use dialer_core::{
    models::{Campaign, DispatchCandidate, QueueEntry},
    traits::{AllocationStore, AllocationTx},
    AppError, AppResult,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::repositories::campaign_repo::PgCampaignRepository;
use crate::repositories::queue_repo::QueueRow;

/// PostgreSQL-backed allocation store
#[derive(Clone)]
pub struct PgAllocationStore {
    pool: PgPool,
}

impl PgAllocationStore {
    /// Create a new allocation store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    type Tx = PgAllocationTx;

    async fn begin(&self, user_id: Uuid) -> AppResult<PgAllocationTx> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start allocation transaction for {}: {}", user_id, e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        Ok(PgAllocationTx { tx, user_id })
    }
}

/// One allocation transaction
pub struct PgAllocationTx {
    tx: Transaction<'static, Postgres>,
    user_id: Uuid,
}

#[async_trait]
impl AllocationTx for PgAllocationTx {
    #[instrument(skip(self))]
    async fn candidates(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DispatchCandidate>> {
        if user_id != self.user_id {
            return Err(AppError::Internal(format!(
                "allocation transaction for {} cannot read queue of {}",
                self.user_id, user_id
            )));
        }

        let rows = sqlx::query_as::<sqlx::Postgres, CandidateRow>(
            r#"
            SELECT
                q.id, q.user_id, q.call_type, q.campaign_id, q.status,
                q.scheduled_for, q.priority, q.position, q.created_at,
                q.last_system_allocation_at,
                c.user_id AS campaign_user_id,
                c.name AS campaign_name,
                c.status AS campaign_status,
                c.use_custom_timezone,
                c.campaign_timezone,
                c.first_call_time,
                c.last_call_time,
                c.last_served_at AS campaign_last_served_at,
                c.created_at AS campaign_created_at,
                c.updated_at AS campaign_updated_at,
                a.timezone AS account_timezone
            FROM call_queue q
            JOIN accounts a ON a.id = q.user_id
            LEFT JOIN campaigns c ON c.id = q.campaign_id
            WHERE q.user_id = $1
                AND q.status = 'queued'
                AND q.scheduled_for <= $2
                AND (q.call_type = 'direct' OR c.status = 'active')
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            error!("Database error loading candidates for {}: {}", user_id, e);
            AppError::Database(format!("Failed to load dispatch candidates: {}", e))
        })?;

        debug!("Loaded {} dispatch candidates for {}", rows.len(), user_id);

        Ok(rows.into_iter().filter_map(CandidateRow::into_candidate).collect())
    }

    #[instrument(skip(self, candidate), fields(entry_id = %candidate.entry.id))]
    async fn claim(
        &mut self,
        candidate: &DispatchCandidate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<QueueEntry>> {
        let claimed = sqlx::query_as::<sqlx::Postgres, QueueRow>(
            r#"
            UPDATE call_queue
            SET status = 'allocated',
                last_system_allocation_at = $3
            WHERE id = $1
                AND user_id = $2
                AND status = 'queued'
            RETURNING
                id, user_id, call_type, campaign_id, status,
                scheduled_for, priority, position, created_at,
                last_system_allocation_at
            "#,
        )
        .bind(candidate.entry.id)
        .bind(self.user_id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            error!("Database error claiming {}: {}", candidate.entry.id, e);
            AppError::Database(format!("Failed to claim queue entry: {}", e))
        })?;

        let Some(row) = claimed else {
            debug!("Queue entry {} no longer queued", candidate.entry.id);
            return Ok(None);
        };

        if let Some(campaign_id) = row.campaign_id {
            sqlx::query(
                r#"
                UPDATE campaigns
                SET last_served_at = $2
                WHERE id = $1
                    AND (last_served_at IS NULL OR last_served_at < $2)
                "#,
            )
            .bind(campaign_id)
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                error!("Database error stamping campaign {}: {}", campaign_id, e);
                AppError::Database(format!("Failed to stamp campaign: {}", e))
            })?;
        }

        Ok(Some(row.into()))
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            error!("Failed to commit allocation for {}: {}", self.user_id, e);
            AppError::Transaction(format!("Failed to commit allocation: {}", e))
        })
    }
}

/// Queue row joined with its campaign and account
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    #[sqlx(flatten)]
    queue: QueueRow,
    campaign_user_id: Option<Uuid>,
    campaign_name: Option<String>,
    campaign_status: Option<String>,
    use_custom_timezone: Option<bool>,
    campaign_timezone: Option<String>,
    first_call_time: Option<NaiveTime>,
    last_call_time: Option<NaiveTime>,
    campaign_last_served_at: Option<DateTime<Utc>>,
    campaign_created_at: Option<DateTime<Utc>>,
    campaign_updated_at: Option<DateTime<Utc>>,
    account_timezone: Option<String>,
}

impl CandidateRow {
    fn into_candidate(self) -> Option<DispatchCandidate> {
        let campaign = match self.queue.campaign_id {
            None => None,
            Some(campaign_id) => {
                let (Some(user_id), Some(status), Some(first), Some(last)) = (
                    self.campaign_user_id,
                    self.campaign_status.as_deref(),
                    self.first_call_time,
                    self.last_call_time,
                ) else {
                    warn!(
                        "Queue entry {} references incomplete campaign {}, skipping",
                        self.queue.id, campaign_id
                    );
                    return None;
                };

                Some(Campaign {
                    id: campaign_id,
                    user_id,
                    name: self.campaign_name.unwrap_or_default(),
                    status: PgCampaignRepository::parse_status(status),
                    use_custom_timezone: self.use_custom_timezone.unwrap_or(false),
                    campaign_timezone: self.campaign_timezone,
                    first_call_time: first,
                    last_call_time: last,
                    last_served_at: self.campaign_last_served_at,
                    created_at: self.campaign_created_at.unwrap_or(self.queue.created_at),
                    updated_at: self.campaign_updated_at.unwrap_or(self.queue.created_at),
                })
            }
        };

        let entry: QueueEntry = self.queue.into();

        Some(DispatchCandidate {
            entry,
            campaign,
            account_timezone: self.account_timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_core::models::{CallType, CampaignStatus};

    fn queue_row(campaign_id: Option<Uuid>) -> QueueRow {
        let now = Utc::now();
        QueueRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            call_type: (if campaign_id.is_some() { "campaign" } else { "direct" }).to_string(),
            campaign_id,
            status: "queued".to_string(),
            scheduled_for: now,
            priority: 0,
            position: 1,
            created_at: now,
            last_system_allocation_at: None,
        }
    }

    fn candidate_row(queue: QueueRow) -> CandidateRow {
        CandidateRow {
            queue,
            campaign_user_id: None,
            campaign_name: None,
            campaign_status: None,
            use_custom_timezone: None,
            campaign_timezone: None,
            first_call_time: None,
            last_call_time: None,
            campaign_last_served_at: None,
            campaign_created_at: None,
            campaign_updated_at: None,
            account_timezone: Some("America/New_York".to_string()),
        }
    }

    #[test]
    fn test_direct_candidate_has_no_campaign() {
        let candidate = candidate_row(queue_row(None))
            .into_candidate()
            .expect("direct row converts");

        assert_eq!(candidate.entry.call_type, CallType::Direct);
        assert!(candidate.campaign.is_none());
        assert_eq!(
            candidate.account_timezone.as_deref(),
            Some("America/New_York")
        );
    }

    #[test]
    fn test_campaign_candidate_conversion() {
        let campaign_id = Uuid::new_v4();
        let mut row = candidate_row(queue_row(Some(campaign_id)));
        row.campaign_user_id = Some(row.queue.user_id);
        row.campaign_status = Some("active".to_string());
        row.use_custom_timezone = Some(true);
        row.campaign_timezone = Some("Asia/Kolkata".to_string());
        row.first_call_time = NaiveTime::from_hms_opt(9, 0, 0);
        row.last_call_time = NaiveTime::from_hms_opt(18, 0, 0);

        let candidate = row.into_candidate().expect("campaign row converts");
        let campaign = candidate.campaign.expect("campaign attached");
        assert_eq!(campaign.id, campaign_id);
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.timezone_override(), Some("Asia/Kolkata"));
    }

    #[test]
    fn test_incomplete_campaign_is_skipped() {
        let row = candidate_row(queue_row(Some(Uuid::new_v4())));
        assert!(row.into_candidate().is_none());
    }
}
