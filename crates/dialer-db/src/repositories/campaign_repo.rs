//! Campaign repository implementation
//!
//! Provides PostgreSQL-backed read access to campaign configuration plus
//! status changes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use dialer_core::{
    models::{Campaign, CampaignStatus},
    traits::{CampaignRepository, Repository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of CampaignRepository
pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse campaign status from string
    ///
    /// Unknown values are treated as paused so they never dispatch.
    pub(crate) fn parse_status(s: &str) -> CampaignStatus {
        CampaignStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown campaign status '{}', treating as paused", s);
            CampaignStatus::Paused
        })
    }
}

#[async_trait]
impl Repository<Campaign, Uuid> for PgCampaignRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Campaign>> {
        debug!("Finding campaign by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, CampaignRow>(
            r#"
            SELECT
                id, user_id, name, status,
                use_custom_timezone, campaign_timezone,
                first_call_time, last_call_time, last_served_at,
                created_at, updated_at
            FROM campaigns
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding campaign {}: {}", id, e);
            AppError::Database(format!("Failed to find campaign: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Campaign>> {
        let rows = sqlx::query_as::<sqlx::Postgres, CampaignRow>(
            r#"
            SELECT
                id, user_id, name, status,
                use_custom_timezone, campaign_timezone,
                first_call_time, last_call_time, last_served_at,
                created_at, updated_at
            FROM campaigns
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding campaigns: {}", e);
            AppError::Database(format!("Failed to fetch campaigns: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM campaigns")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting campaigns: {}", e);
                AppError::Database(format!("Failed to count campaigns: {}", e))
            })?;

        Ok(result.0)
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Campaign>> {
        let rows = sqlx::query_as::<sqlx::Postgres, CampaignRow>(
            r#"
            SELECT
                id, user_id, name, status,
                use_custom_timezone, campaign_timezone,
                first_call_time, last_call_time, last_served_at,
                created_at, updated_at
            FROM campaigns
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing campaigns for {}: {}", user_id, e);
            AppError::Database(format!("Failed to list campaigns: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: CampaignStatus) -> AppResult<Campaign> {
        debug!("Updating campaign {} status to {}", id, status);

        let row = sqlx::query_as::<sqlx::Postgres, CampaignRow>(
            r#"
            UPDATE campaigns
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, user_id, name, status,
                use_custom_timezone, campaign_timezone,
                first_call_time, last_call_time, last_served_at,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating campaign status: {}", e);
            AppError::Database(format!("Failed to update campaign status: {}", e))
        })?
        .ok_or_else(|| AppError::CampaignNotFound(id.to_string()))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    status: String,
    use_custom_timezone: bool,
    campaign_timezone: Option<String>,
    first_call_time: NaiveTime,
    last_call_time: NaiveTime,
    last_served_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CampaignRow> for Campaign {
    fn from(row: CampaignRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            status: PgCampaignRepository::parse_status(&row.status),
            use_custom_timezone: row.use_custom_timezone,
            campaign_timezone: row.campaign_timezone,
            first_call_time: row.first_call_time,
            last_call_time: row.last_call_time,
            last_served_at: row.last_served_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
