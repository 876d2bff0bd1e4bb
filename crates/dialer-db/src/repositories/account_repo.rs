//! Account repository implementation
//!
//! Provides PostgreSQL-backed storage for accounts. The scheduler only reads
//! the default timezone; updates validate it against the IANA database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dialer_core::{
    models::Account,
    traits::{AccountRepository, Repository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of AccountRepository
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Account, Uuid> for PgAccountRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        debug!("Finding account by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            SELECT id, email, timezone, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding account {}: {}", id, e);
            AppError::Database(format!("Failed to find account: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Account>> {
        let rows = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            SELECT id, email, timezone, created_at, updated_at
            FROM accounts
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding accounts: {}", e);
            AppError::Database(format!("Failed to fetch accounts: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting accounts: {}", e);
                AppError::Database(format!("Failed to count accounts: {}", e))
            })?;

        Ok(result.0)
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self))]
    async fn update_timezone(&self, id: Uuid, timezone: &str) -> AppResult<Account> {
        let timezone = timezone.trim();
        if timezone.parse::<Tz>().is_err() {
            return Err(AppError::InvalidTimezone(timezone.to_string()));
        }

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(
            r#"
            UPDATE accounts
            SET timezone = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, timezone, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(timezone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating account timezone: {}", e);
            AppError::Database(format!("Failed to update account timezone: {}", e))
        })?
        .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: Option<String>,
    timezone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            timezone: row.timezone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
