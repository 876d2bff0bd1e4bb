//! Call allocator
//!
//! Picks the next queued call for an account and claims it, all inside one
//! allocation transaction:
//!
//! 1. Load the account's candidate snapshot.
//! 2. Drop candidates that are not eligible right now.
//! 3. Rank the rest: direct calls before campaign calls; direct calls by
//!    priority, position, created_at; campaign calls by fairness timestamp
//!    (never served first), then priority, position, created_at.
//! 4. Claim in rank order with a conditional update. A candidate already
//!    taken by a concurrent allocator is skipped.
//! 5. Commit. Any error before the commit discards the claim.
//!
//! Ordering comparisons use server (UTC) instants only; local time is used
//! for the calling window and nothing else.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dialer_core::{
    config::{FairnessScope, SchedulerConfig},
    models::{CallType, DispatchCandidate, QueueEntry, QueueStatus},
    traits::{AllocationStore, AllocationTx},
    AppResult,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::eligibility::EligibilityFilter;
use crate::timezone::TimezoneResolver;

/// Selects and claims queued calls for the dispatch loop
pub struct CallAllocator<S: AllocationStore> {
    store: Arc<S>,
    filter: EligibilityFilter,
    fairness: FairnessScope,
}

impl<S: AllocationStore> CallAllocator<S> {
    /// Create a new allocator from the scheduler configuration
    pub fn new(store: Arc<S>, config: &SchedulerConfig) -> Self {
        Self {
            store,
            filter: EligibilityFilter::new(
                TimezoneResolver::new(config.fallback_timezone.clone()),
                config.overnight_windows,
            ),
            fairness: config.fairness_scope,
        }
    }

    /// Eligibility filter in use
    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    /// Allocate the next call for `user_id` at the current instant.
    ///
    /// `Ok(None)` means there is no eligible work; the caller should idle and
    /// retry later. Storage errors leave nothing claimed.
    pub async fn allocate_next(&self, user_id: Uuid) -> AppResult<Option<QueueEntry>> {
        self.allocate_next_at(user_id, Utc::now()).await
    }

    /// Allocate the next call for `user_id` as of `now`
    #[instrument(skip(self), fields(fairness = ?self.fairness))]
    pub async fn allocate_next_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<QueueEntry>> {
        let mut tx = self.store.begin(user_id).await?;
        let candidates = tx.candidates(user_id, now).await?;
        let ranked = self.rank(user_id, &candidates, now);

        debug!(
            "{} of {} candidates eligible for {}",
            ranked.len(),
            candidates.len(),
            user_id
        );

        for candidate in ranked {
            match tx.claim(candidate, now).await? {
                Some(entry) => {
                    tx.commit().await?;
                    info!(
                        entry_id = %entry.id,
                        call_type = %entry.call_type,
                        campaign_id = ?entry.campaign_id,
                        "Allocated queued call for {}",
                        user_id
                    );
                    return Ok(Some(entry));
                }
                None => {
                    debug!(
                        "Entry {} was claimed concurrently, trying next candidate",
                        candidate.entry.id
                    );
                }
            }
        }

        debug!("No eligible queued calls for {}", user_id);
        Ok(None)
    }

    /// Eligible candidates in dispatch order
    pub fn rank<'a>(
        &self,
        user_id: Uuid,
        candidates: &'a [DispatchCandidate],
        now: DateTime<Utc>,
    ) -> Vec<&'a DispatchCandidate> {
        let mut eligible: Vec<&DispatchCandidate> = candidates
            .iter()
            .filter(|c| c.entry.user_id == user_id && c.entry.status == QueueStatus::Queued)
            .filter(|c| {
                let verdict = self.filter.check(c, now);
                if !verdict.is_eligible() {
                    debug!("Skipping entry {}: {:?}", c.entry.id, verdict);
                }
                verdict.is_eligible()
            })
            .collect();

        eligible.sort_by(|a, b| dispatch_order(a, b, self.fairness));
        eligible
    }

    /// First candidate in dispatch order, without claiming it
    pub fn select<'a>(
        &self,
        user_id: Uuid,
        candidates: &'a [DispatchCandidate],
        now: DateTime<Utc>,
    ) -> Option<&'a DispatchCandidate> {
        self.rank(user_id, candidates, now).into_iter().next()
    }
}

/// Round-robin key for a candidate; `None` (never served) sorts first
pub fn fairness_key(candidate: &DispatchCandidate, scope: FairnessScope) -> Option<DateTime<Utc>> {
    match scope {
        FairnessScope::Entry => candidate.entry.last_system_allocation_at,
        FairnessScope::Campaign => candidate
            .campaign
            .as_ref()
            .and_then(|c| c.last_served_at)
            .or(candidate.entry.last_system_allocation_at),
    }
}

/// Total dispatch order between two candidates
pub fn dispatch_order(a: &DispatchCandidate, b: &DispatchCandidate, scope: FairnessScope) -> Ordering {
    let class = |c: &DispatchCandidate| match c.entry.call_type {
        CallType::Direct => 0u8,
        CallType::Campaign => 1u8,
    };

    class(a).cmp(&class(b)).then_with(|| {
        let fairness = if a.entry.is_direct() {
            Ordering::Equal
        } else {
            fairness_key(a, scope).cmp(&fairness_key(b, scope))
        };

        fairness
            .then_with(|| b.entry.priority.cmp(&a.entry.priority))
            .then_with(|| a.entry.position.cmp(&b.entry.position))
            .then_with(|| a.entry.created_at.cmp(&b.entry.created_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, TimeZone};
    use dialer_core::models::{Campaign, CampaignStatus};

    struct NoStore;

    struct NoTx;

    #[async_trait::async_trait]
    impl AllocationStore for NoStore {
        type Tx = NoTx;

        async fn begin(&self, _user_id: Uuid) -> AppResult<NoTx> {
            Ok(NoTx)
        }
    }

    #[async_trait::async_trait]
    impl AllocationTx for NoTx {
        async fn candidates(
            &mut self,
            _user_id: Uuid,
            _now: DateTime<Utc>,
        ) -> AppResult<Vec<DispatchCandidate>> {
            Ok(Vec::new())
        }

        async fn claim(
            &mut self,
            _candidate: &DispatchCandidate,
            _now: DateTime<Utc>,
        ) -> AppResult<Option<QueueEntry>> {
            Ok(None)
        }

        async fn commit(self) -> AppResult<()> {
            Ok(())
        }
    }

    fn allocator(scope: FairnessScope) -> CallAllocator<NoStore> {
        let config = SchedulerConfig {
            fairness_scope: scope,
            ..Default::default()
        };
        CallAllocator::new(Arc::new(NoStore), &config)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn open_campaign(user_id: Uuid) -> Campaign {
        Campaign {
            user_id,
            first_call_time: NaiveTime::MIN,
            last_call_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            ..Default::default()
        }
    }

    fn direct(user_id: Uuid, priority: i32, position: i32) -> DispatchCandidate {
        let mut entry = QueueEntry::direct(user_id, priority, position);
        entry.scheduled_for = noon() - Duration::minutes(1);
        DispatchCandidate::direct(entry, None)
    }

    fn campaign_call(campaign: &Campaign, priority: i32, position: i32) -> DispatchCandidate {
        let mut entry = QueueEntry::campaign(campaign.user_id, campaign.id, priority, position);
        entry.scheduled_for = noon() - Duration::minutes(1);
        DispatchCandidate::campaign(entry, campaign.clone(), None)
    }

    #[test]
    fn test_direct_beats_campaign() {
        let user = Uuid::new_v4();
        let campaign = open_campaign(user);
        let candidates = vec![campaign_call(&campaign, 100, 1), direct(user, 0, 50)];

        let picked = allocator(FairnessScope::Campaign)
            .select(user, &candidates, noon())
            .unwrap();
        assert!(picked.entry.is_direct());
    }

    #[test]
    fn test_direct_order_priority_position_created() {
        let user = Uuid::new_v4();
        let low = direct(user, 1, 1);
        let high_late = direct(user, 5, 9);
        let high_early = direct(user, 5, 3);
        let mut same_slot_newer = direct(user, 5, 3);
        same_slot_newer.entry.created_at = high_early.entry.created_at + Duration::seconds(1);

        let candidates = vec![low, high_late, same_slot_newer, high_early.clone()];
        let ranked = allocator(FairnessScope::Campaign).rank(user, &candidates, noon());

        assert_eq!(ranked[0].entry.id, high_early.entry.id);
        assert_eq!(ranked[1].entry.position, 3);
        assert_eq!(ranked[2].entry.position, 9);
        assert_eq!(ranked[3].entry.priority, 1);
    }

    #[test]
    fn test_campaign_priority_beats_position() {
        let user = Uuid::new_v4();
        let campaign = open_campaign(user);
        let e1 = campaign_call(&campaign, 5, 1);
        let e2 = campaign_call(&campaign, 10, 2);
        let candidates = vec![e1, e2.clone()];

        let picked = allocator(FairnessScope::Entry)
            .select(user, &candidates, noon())
            .unwrap();
        assert_eq!(picked.entry.id, e2.entry.id);
    }

    #[test]
    fn test_fairness_outranks_priority() {
        let user = Uuid::new_v4();
        let mut served = open_campaign(user);
        served.last_served_at = Some(noon() - Duration::hours(1));
        let fresh = open_campaign(user);

        let busy = campaign_call(&served, 100, 1);
        let waiting = campaign_call(&fresh, 0, 99);
        let candidates = vec![busy, waiting.clone()];

        let picked = allocator(FairnessScope::Campaign)
            .select(user, &candidates, noon())
            .unwrap();
        assert_eq!(picked.entry.id, waiting.entry.id);
    }

    #[test]
    fn test_entry_scope_ignores_campaign_stamp() {
        let user = Uuid::new_v4();
        let mut served = open_campaign(user);
        served.last_served_at = Some(noon() - Duration::minutes(1));

        let sibling = campaign_call(&served, 10, 1);
        let mut stamped = campaign_call(&open_campaign(user), 10, 2);
        stamped.entry.last_system_allocation_at = Some(noon() - Duration::hours(2));

        assert_eq!(fairness_key(&sibling, FairnessScope::Entry), None);
        assert_eq!(
            fairness_key(&sibling, FairnessScope::Campaign),
            served.last_served_at
        );

        let candidates = vec![stamped, sibling.clone()];
        let picked = allocator(FairnessScope::Entry)
            .select(user, &candidates, noon())
            .unwrap();
        assert_eq!(picked.entry.id, sibling.entry.id);
    }

    #[test]
    fn test_ineligible_and_foreign_rows_dropped() {
        let user = Uuid::new_v4();
        let mut paused = open_campaign(user);
        paused.status = CampaignStatus::Paused;

        let mut future = direct(user, 0, 1);
        future.entry.scheduled_for = noon() + Duration::minutes(5);
        let mut allocated = direct(user, 0, 2);
        allocated.entry.status = QueueStatus::Allocated;
        let foreign = direct(Uuid::new_v4(), 0, 3);

        let candidates = vec![future, allocated, foreign, campaign_call(&paused, 0, 4)];
        assert!(allocator(FairnessScope::Campaign)
            .rank(user, &candidates, noon())
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_yields_none() {
        let result = allocator(FairnessScope::Campaign)
            .allocate_next(Uuid::new_v4())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
