//! In-memory allocation store
//!
//! Keeps accounts, campaigns and queue entries in process memory behind a
//! `parking_lot::RwLock`. Allocation transactions for the same account are
//! serialized with a per-account async mutex held for the life of the
//! transaction; claims are staged and only applied on `commit`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dialer_core::{
    models::{Account, Campaign, CallType, DispatchCandidate, QueueEntry, QueueStatus},
    traits::{AllocationStore, AllocationTx},
    AppError, AppResult,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    campaigns: HashMap<Uuid, Campaign>,
    entries: HashMap<Uuid, QueueEntry>,
}

/// Process-local allocation store
#[derive(Default)]
pub struct MemoryAllocationStore {
    state: Arc<RwLock<State>>,
    user_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: Account) {
        self.state.write().accounts.insert(account.id, account);
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.state.write().campaigns.insert(campaign.id, campaign);
    }

    /// Add a queue entry; a campaign entry must reference a known campaign of
    /// the same account
    pub fn insert_entry(&self, entry: QueueEntry) -> AppResult<()> {
        if !entry.has_consistent_campaign() {
            return Err(AppError::InvalidInput(format!(
                "queue entry {} has inconsistent call type and campaign",
                entry.id
            )));
        }

        let mut state = self.state.write();
        if let Some(campaign_id) = entry.campaign_id {
            match state.campaigns.get(&campaign_id) {
                Some(c) if c.user_id == entry.user_id => {}
                Some(_) => {
                    return Err(AppError::InvalidInput(format!(
                        "campaign {} belongs to another account",
                        campaign_id
                    )))
                }
                None => return Err(AppError::CampaignNotFound(campaign_id.to_string())),
            }
        }

        state.entries.insert(entry.id, entry);
        Ok(())
    }

    pub fn entry(&self, id: Uuid) -> Option<QueueEntry> {
        self.state.read().entries.get(&id).cloned()
    }

    pub fn campaign(&self, id: Uuid) -> Option<Campaign> {
        self.state.read().campaigns.get(&id).cloned()
    }

    /// Entries of an account with the given status
    pub fn entries_with_status(&self, user_id: Uuid, status: QueueStatus) -> Vec<QueueEntry> {
        self.state
            .read()
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.status == status)
            .cloned()
            .collect()
    }

    /// Write back a status the way the dispatch loop does
    pub fn set_status(&self, id: Uuid, status: QueueStatus) -> AppResult<QueueEntry> {
        let mut state = self.state.write();
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| AppError::QueueEntryNotFound(id.to_string()))?;

        if !entry.status.can_write_back(status) {
            return Err(AppError::InvalidStatusTransition {
                from: entry.status.to_string(),
                to: status.to_string(),
            });
        }

        entry.status = status;
        Ok(entry.clone())
    }

    /// Make the next commit fail, discarding its claims
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.user_locks
            .lock()
            .entry(user_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[async_trait]
impl AllocationStore for MemoryAllocationStore {
    type Tx = MemoryAllocationTx;

    async fn begin(&self, user_id: Uuid) -> AppResult<MemoryAllocationTx> {
        let guard = self.user_lock(user_id).lock_owned().await;

        Ok(MemoryAllocationTx {
            state: Arc::clone(&self.state),
            fail_commit: Arc::clone(&self.fail_next_commit),
            user_id,
            staged: Vec::new(),
            _guard: guard,
        })
    }
}

#[derive(Debug)]
struct StagedClaim {
    entry_id: Uuid,
    campaign_id: Option<Uuid>,
    at: DateTime<Utc>,
}

/// One in-memory allocation transaction
pub struct MemoryAllocationTx {
    state: Arc<RwLock<State>>,
    fail_commit: Arc<AtomicBool>,
    user_id: Uuid,
    staged: Vec<StagedClaim>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl AllocationTx for MemoryAllocationTx {
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

        let state = self.state.read();
        let account_timezone = state
            .accounts
            .get(&user_id)
            .and_then(|a| a.timezone.clone());

        let candidates = state
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.status == QueueStatus::Queued && e.is_due(now))
            .filter_map(|e| match (e.call_type, e.campaign_id) {
                (CallType::Direct, _) => {
                    Some(DispatchCandidate::direct(e.clone(), account_timezone.clone()))
                }
                (CallType::Campaign, Some(campaign_id)) => state
                    .campaigns
                    .get(&campaign_id)
                    .filter(|c| c.status.is_dispatchable())
                    .map(|c| {
                        DispatchCandidate::campaign(e.clone(), c.clone(), account_timezone.clone())
                    }),
                (CallType::Campaign, None) => {
                    warn!("Campaign queue entry {} has no campaign, skipping", e.id);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("Loaded {} dispatch candidates for {}", candidates.len(), user_id);
        Ok(candidates)
    }

    async fn claim(
        &mut self,
        candidate: &DispatchCandidate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<QueueEntry>> {
        let id = candidate.entry.id;
        if self.staged.iter().any(|s| s.entry_id == id) {
            return Ok(None);
        }

        let state = self.state.read();
        let Some(current) = state
            .entries
            .get(&id)
            .filter(|e| e.user_id == self.user_id && e.status == QueueStatus::Queued)
        else {
            debug!("Queue entry {} no longer queued", id);
            return Ok(None);
        };

        let mut claimed = current.clone();
        claimed.status = QueueStatus::Allocated;
        claimed.last_system_allocation_at = Some(now);

        self.staged.push(StagedClaim {
            entry_id: id,
            campaign_id: claimed.campaign_id,
            at: now,
        });

        Ok(Some(claimed))
    }

    async fn commit(self) -> AppResult<()> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transaction(
                "Failed to commit allocation: injected failure".to_string(),
            ));
        }

        let mut state = self.state.write();

        // all-or-nothing: verify before touching anything
        for claim in &self.staged {
            let still_queued = state
                .entries
                .get(&claim.entry_id)
                .is_some_and(|e| e.status == QueueStatus::Queued);
            if !still_queued {
                return Err(AppError::Conflict(format!(
                    "queue entry {} changed during allocation",
                    claim.entry_id
                )));
            }
        }

        for claim in &self.staged {
            if let Some(entry) = state.entries.get_mut(&claim.entry_id) {
                entry.status = QueueStatus::Allocated;
                entry.last_system_allocation_at = Some(claim.at);
            }

            if let Some(campaign) = claim
                .campaign_id
                .and_then(|id| state.campaigns.get_mut(&id))
            {
                if campaign.last_served_at.map_or(true, |t| t < claim.at) {
                    campaign.last_served_at = Some(claim.at);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seeded() -> (MemoryAllocationStore, Uuid, Campaign) {
        let store = MemoryAllocationStore::new();
        let account = Account::default();
        let user_id = account.id;
        store.insert_account(account);

        let campaign = Campaign {
            user_id,
            ..Default::default()
        };
        store.insert_campaign(campaign.clone());
        (store, user_id, campaign)
    }

    #[test]
    fn test_insert_rejects_foreign_campaign() {
        let (store, _, campaign) = seeded();
        let stranger = QueueEntry::campaign(Uuid::new_v4(), campaign.id, 0, 1);
        assert!(matches!(
            store.insert_entry(stranger),
            Err(AppError::InvalidInput(_))
        ));

        let unknown = QueueEntry::campaign(campaign.user_id, Uuid::new_v4(), 0, 1);
        assert!(matches!(
            store.insert_entry(unknown),
            Err(AppError::CampaignNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_is_invisible_until_commit() {
        let (store, user_id, _) = seeded();
        let entry = QueueEntry::direct(user_id, 0, 1);
        store.insert_entry(entry.clone()).unwrap();

        let now = Utc::now() + Duration::seconds(1);
        let mut tx = store.begin(user_id).await.unwrap();
        let candidates = tx.candidates(user_id, now).await.unwrap();
        assert_eq!(candidates.len(), 1);

        let claimed = tx.claim(&candidates[0], now).await.unwrap().unwrap();
        assert_eq!(claimed.status, QueueStatus::Allocated);
        assert_eq!(store.entry(entry.id).unwrap().status, QueueStatus::Queued);

        // second claim in the same transaction loses
        assert!(tx.claim(&candidates[0], now).await.unwrap().is_none());

        tx.commit().await.unwrap();
        let stored = store.entry(entry.id).unwrap();
        assert_eq!(stored.status, QueueStatus::Allocated);
        assert_eq!(stored.last_system_allocation_at, Some(now));
    }

    #[tokio::test]
    async fn test_drop_discards_claims() {
        let (store, user_id, campaign) = seeded();
        let entry = QueueEntry::campaign(user_id, campaign.id, 0, 1);
        store.insert_entry(entry.clone()).unwrap();

        let now = Utc::now() + Duration::seconds(1);
        {
            let mut tx = store.begin(user_id).await.unwrap();
            let candidates = tx.candidates(user_id, now).await.unwrap();
            tx.claim(&candidates[0], now).await.unwrap();
        }

        assert_eq!(store.entry(entry.id).unwrap().status, QueueStatus::Queued);
        assert_eq!(store.campaign(campaign.id).unwrap().last_served_at, None);
    }

    #[tokio::test]
    async fn test_injected_commit_failure() {
        let (store, user_id, _) = seeded();
        let entry = QueueEntry::direct(user_id, 0, 1);
        store.insert_entry(entry.clone()).unwrap();
        store.fail_next_commit();

        let now = Utc::now() + Duration::seconds(1);
        let mut tx = store.begin(user_id).await.unwrap();
        let candidates = tx.candidates(user_id, now).await.unwrap();
        tx.claim(&candidates[0], now).await.unwrap();

        assert!(matches!(tx.commit().await, Err(AppError::Transaction(_))));
        let stored = store.entry(entry.id).unwrap();
        assert_eq!(stored.status, QueueStatus::Queued);
        assert_eq!(stored.last_system_allocation_at, None);
    }

    #[tokio::test]
    async fn test_candidates_skip_inactive_campaign_and_future_rows() {
        let (store, user_id, mut campaign) = seeded();
        campaign.status = dialer_core::models::CampaignStatus::Paused;
        store.insert_campaign(campaign.clone());

        store
            .insert_entry(QueueEntry::campaign(user_id, campaign.id, 0, 1))
            .unwrap();
        let mut later = QueueEntry::direct(user_id, 0, 2);
        later.scheduled_for = Utc::now() + Duration::hours(1);
        store.insert_entry(later).unwrap();

        let mut tx = store.begin(user_id).await.unwrap();
        let candidates = tx
            .candidates(user_id, Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_set_status_write_back_rules() {
        let (store, user_id, _) = seeded();
        let entry = QueueEntry::direct(user_id, 0, 1);
        store.insert_entry(entry.clone()).unwrap();

        assert!(matches!(
            store.set_status(entry.id, QueueStatus::Completed),
            Err(AppError::InvalidStatusTransition { .. })
        ));
        assert_eq!(
            store
                .set_status(entry.id, QueueStatus::Cancelled)
                .unwrap()
                .status,
            QueueStatus::Cancelled
        );
        assert!(matches!(
            store.set_status(Uuid::new_v4(), QueueStatus::Cancelled),
            Err(AppError::QueueEntryNotFound(_))
        ));
    }
}
