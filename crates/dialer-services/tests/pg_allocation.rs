//! Allocation against PostgreSQL
//!
//! Needs a database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dialer_core::{
    config::SchedulerConfig,
    models::{CallType, NewQueueEntry, QueueEntry, QueueStatus},
    traits::{AllocationStore, AllocationTx, QueueRepository, Repository},
};
use dialer_db::{create_pool, run_migrations, PgAllocationStore, PgPool, PgQueueRepository};
use dialer_services::PgCallAllocator;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool(&url, Some(20)).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// A fresh account with one all-day campaign in UTC
async fn seed_account(pool: &PgPool, campaign_status: &str) -> (Uuid, Uuid) {
    let user_id = Uuid::new_v4();
    let campaign_id = Uuid::new_v4();

    sqlx::query("INSERT INTO accounts (id, timezone) VALUES ($1, 'UTC')")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO campaigns (id, user_id, name, status, first_call_time, last_call_time)
        VALUES ($1, $2, 'integration', $3, '00:00:00', '23:59:59')
        "#,
    )
    .bind(campaign_id)
    .bind(user_id)
    .bind(campaign_status)
    .execute(pool)
    .await
    .unwrap();

    (user_id, campaign_id)
}

async fn enqueue(pool: &PgPool, user_id: Uuid, campaign_id: Option<Uuid>) -> QueueEntry {
    let call_type = if campaign_id.is_some() {
        CallType::Campaign
    } else {
        CallType::Direct
    };

    PgQueueRepository::new(pool.clone())
        .enqueue(&NewQueueEntry {
            user_id,
            call_type,
            campaign_id,
            scheduled_for: None,
            priority: 0,
            position: None,
        })
        .await
        .unwrap()
}

async fn last_served_at(pool: &PgPool, campaign_id: Uuid) -> Option<DateTime<Utc>> {
    sqlx::query_scalar("SELECT last_served_at FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn allocator(pool: &PgPool) -> Arc<PgCallAllocator> {
    Arc::new(PgCallAllocator::new(
        Arc::new(PgAllocationStore::new(pool.clone())),
        &SchedulerConfig::default(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_allocations_claim_distinct_rows() {
    let pool = pool().await;
    let (user_id, campaign_id) = seed_account(&pool, "active").await;

    let mut queued = HashSet::new();
    for i in 0..4 {
        let campaign = if i % 2 == 0 { Some(campaign_id) } else { None };
        queued.insert(enqueue(&pool, user_id, campaign).await.id);
    }

    let allocator = allocator(&pool);
    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            tokio::spawn(async move { allocator.allocate_next(user_id).await })
        })
        .collect();

    let mut claimed = Vec::new();
    for result in futures::future::join_all(tasks).await {
        if let Some(entry) = result.unwrap().unwrap() {
            claimed.push(entry.id);
        }
    }

    let distinct: HashSet<Uuid> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), 4);
    assert_eq!(distinct, queued);

    assert!(allocator.allocate_next(user_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_campaign_claim_stamps_last_served_at() {
    let pool = pool().await;
    let (user_id, campaign_id) = seed_account(&pool, "active").await;
    let entry = enqueue(&pool, user_id, Some(campaign_id)).await;
    assert_eq!(last_served_at(&pool, campaign_id).await, None);

    let claimed = allocator(&pool)
        .allocate_next(user_id)
        .await
        .unwrap()
        .expect("campaign entry should be allocated");

    assert_eq!(claimed.id, entry.id);
    assert_eq!(claimed.status, QueueStatus::Allocated);
    assert!(claimed.last_system_allocation_at.is_some());
    assert_eq!(
        last_served_at(&pool, campaign_id).await,
        claimed.last_system_allocation_at
    );
}

#[tokio::test]
#[ignore]
async fn test_dropped_transaction_rolls_back_claim() {
    let pool = pool().await;
    let (user_id, campaign_id) = seed_account(&pool, "active").await;
    let entry = enqueue(&pool, user_id, Some(campaign_id)).await;

    let store = PgAllocationStore::new(pool.clone());
    let now = Utc::now();
    {
        let mut tx = store.begin(user_id).await.unwrap();
        let candidates = tx.candidates(user_id, now).await.unwrap();
        assert_eq!(candidates.len(), 1);

        let claimed = tx.claim(&candidates[0], now).await.unwrap();
        assert!(claimed.is_some());
        // dropped without commit
    }

    let stored = PgQueueRepository::new(pool.clone())
        .find_by_id(entry.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueueStatus::Queued);
    assert_eq!(stored.last_system_allocation_at, None);
    assert_eq!(last_served_at(&pool, campaign_id).await, None);
}

#[tokio::test]
#[ignore]
async fn test_paused_campaign_is_not_a_candidate() {
    let pool = pool().await;
    let (user_id, campaign_id) = seed_account(&pool, "paused").await;
    enqueue(&pool, user_id, Some(campaign_id)).await;
    let direct = enqueue(&pool, user_id, None).await;

    let store = PgAllocationStore::new(pool.clone());
    let mut tx = store.begin(user_id).await.unwrap();
    let candidates = tx.candidates(user_id, Utc::now()).await.unwrap();
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.entry.id).collect();
    assert_eq!(ids, vec![direct.id]);
}
