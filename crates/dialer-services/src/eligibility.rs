//! Eligibility filter
//!
//! Decides whether a queued call may be dispatched at a given instant.
//! Direct calls only wait for `scheduled_for`. Campaign calls additionally
//! need an active campaign and a local time inside the calling window.

use chrono::{DateTime, NaiveTime, Utc};
use dialer_core::models::{Campaign, DispatchCandidate, QueueEntry};
use serde::Serialize;

use crate::timezone::{local_time_of_day, TimezoneResolver};

/// Local time-of-day range a campaign may call in, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallWindow {
    pub first: NaiveTime,
    pub last: NaiveTime,
}

impl CallWindow {
    pub fn new(first: NaiveTime, last: NaiveTime) -> Self {
        Self { first, last }
    }

    /// Window configured on a campaign
    pub fn for_campaign(campaign: &Campaign) -> Self {
        Self::new(campaign.first_call_time, campaign.last_call_time)
    }

    /// `first > last`, e.g. 22:00-02:00
    pub fn crosses_midnight(&self) -> bool {
        self.first > self.last
    }

    /// Check whether `local` falls inside the window.
    ///
    /// With `overnight` disabled a midnight-crossing window never matches.
    pub fn contains(&self, local: NaiveTime, overnight: bool) -> bool {
        if self.crosses_midnight() {
            overnight && (local >= self.first || local <= self.last)
        } else {
            self.first <= local && local <= self.last
        }
    }
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    NotDue,
    CampaignMissing,
    CampaignInactive,
    OutsideWindow {
        local_time: NaiveTime,
        window: CallWindow,
    },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Evaluate one entry at `now` against the already resolved zone
pub fn evaluate(
    entry: &QueueEntry,
    campaign: Option<&Campaign>,
    now: DateTime<Utc>,
    effective_timezone: &str,
    overnight_windows: bool,
) -> Eligibility {
    if !entry.is_due(now) {
        return Eligibility::NotDue;
    }

    if entry.is_direct() {
        return Eligibility::Eligible;
    }

    let Some(campaign) = campaign.filter(|c| Some(c.id) == entry.campaign_id) else {
        return Eligibility::CampaignMissing;
    };

    if !campaign.status.is_dispatchable() {
        return Eligibility::CampaignInactive;
    }

    let window = CallWindow::for_campaign(campaign);
    let local_time = local_time_of_day(effective_timezone, now);
    if window.contains(local_time, overnight_windows) {
        Eligibility::Eligible
    } else {
        Eligibility::OutsideWindow { local_time, window }
    }
}

/// Boolean form of [`evaluate`]
pub fn is_eligible(
    entry: &QueueEntry,
    campaign: Option<&Campaign>,
    now: DateTime<Utc>,
    effective_timezone: &str,
    overnight_windows: bool,
) -> bool {
    evaluate(entry, campaign, now, effective_timezone, overnight_windows).is_eligible()
}

/// Resolver and window policy bundled for the allocator
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    resolver: TimezoneResolver,
    overnight_windows: bool,
}

impl EligibilityFilter {
    pub fn new(resolver: TimezoneResolver, overnight_windows: bool) -> Self {
        Self {
            resolver,
            overnight_windows,
        }
    }

    pub fn resolver(&self) -> &TimezoneResolver {
        &self.resolver
    }

    /// Whether midnight-crossing windows are honoured
    pub fn overnight_windows(&self) -> bool {
        self.overnight_windows
    }

    pub fn check(&self, candidate: &DispatchCandidate, now: DateTime<Utc>) -> Eligibility {
        let timezone = self.resolver.for_candidate(candidate);
        evaluate(
            &candidate.entry,
            candidate.campaign.as_ref(),
            now,
            timezone,
            self.overnight_windows,
        )
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(TimezoneResolver::default(), true)
    }
}
