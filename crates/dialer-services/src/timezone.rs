//! Timezone resolution
//!
//! Works out which IANA zone governs a campaign's calling window
//! (campaign override, then account default, then the fallback) and converts
//! instants into that zone's wall-clock time of day using the tz database, so
//! DST transitions are honoured.
//!
//! Unknown zone names are a data problem, not a dispatch problem: they are
//! logged and treated as UTC.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use dialer_core::models::{Account, Campaign, DispatchCandidate};
use tracing::warn;

use crate::constants::DEFAULT_TIMEZONE;

/// Parse an IANA zone name, falling back to UTC
pub fn parse_timezone(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unrecognized timezone '{}', falling back to UTC", name);
            Tz::UTC
        }
    }
}

/// Check whether a name is a known IANA zone
pub fn is_valid_timezone(name: &str) -> bool {
    name.trim().parse::<Tz>().is_ok()
}

/// Effective zone for a campaign owned by `account`: campaign override,
/// then account default, then `"UTC"`.
pub fn resolve_effective_timezone(campaign: Option<&Campaign>, account: &Account) -> String {
    campaign
        .and_then(Campaign::timezone_override)
        .or_else(|| account.timezone())
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string()
}

/// Wall-clock time of day at `now` in `timezone`, truncated to whole seconds
pub fn local_time_of_day(timezone: &str, now: DateTime<Utc>) -> NaiveTime {
    let tz = parse_timezone(timezone);
    let local = now.with_timezone(&tz).time();
    local.with_nanosecond(0).unwrap_or(local)
}

/// Wall-clock time of day right now in `timezone`
pub fn current_local_time_of_day(timezone: &str) -> NaiveTime {
    local_time_of_day(timezone, Utc::now())
}

/// Resolver with a configurable last-resort zone
#[derive(Debug, Clone)]
pub struct TimezoneResolver {
    fallback: String,
}

impl TimezoneResolver {
    /// Create a resolver; an unknown fallback is replaced by UTC
    pub fn new(fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let fallback = if is_valid_timezone(&fallback) {
            fallback.trim().to_string()
        } else {
            warn!(
                "Configured fallback timezone '{}' is not a valid IANA zone, using UTC",
                fallback
            );
            DEFAULT_TIMEZONE.to_string()
        };

        Self { fallback }
    }

    /// The last-resort zone
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Effective zone from an optional campaign and optional account zone
    pub fn effective_timezone<'a>(
        &'a self,
        campaign: Option<&'a Campaign>,
        account_timezone: Option<&'a str>,
    ) -> &'a str {
        campaign
            .and_then(Campaign::timezone_override)
            .or_else(|| account_timezone.map(str::trim).filter(|tz| !tz.is_empty()))
            .unwrap_or(self.fallback.as_str())
    }

    /// Effective zone for a dispatch candidate
    pub fn for_candidate<'a>(&'a self, candidate: &'a DispatchCandidate) -> &'a str {
        self.effective_timezone(
            candidate.campaign.as_ref(),
            candidate.account_timezone.as_deref(),
        )
    }
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn account(tz: Option<&str>) -> Account {
        Account {
            timezone: tz.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_campaign_override_wins() {
        let campaign = Campaign {
            use_custom_timezone: true,
            campaign_timezone: Some("Asia/Kolkata".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_effective_timezone(Some(&campaign), &account(Some("America/New_York"))),
            "Asia/Kolkata"
        );
    }

    #[test]
    fn test_account_fallback_when_override_disabled() {
        let campaign = Campaign {
            use_custom_timezone: false,
            campaign_timezone: Some("Asia/Kolkata".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_effective_timezone(Some(&campaign), &account(Some("America/New_York"))),
            "America/New_York"
        );
    }

    #[test]
    fn test_utc_when_nothing_configured() {
        let campaign = Campaign {
            use_custom_timezone: true,
            campaign_timezone: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            resolve_effective_timezone(Some(&campaign), &account(None)),
            "UTC"
        );
        assert_eq!(resolve_effective_timezone(None, &account(Some(""))), "UTC");
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Mars/Olympus_Mons"), Tz::UTC);
        assert!(!is_valid_timezone("Mars/Olympus_Mons"));

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        assert_eq!(local_time_of_day("Mars/Olympus_Mons", now), hms(14, 30, 0));
    }

    #[test]
    fn test_kolkata_offset() {
        // 03:29:59 UTC is 08:59:59 IST (+05:30)
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 3, 29, 59).unwrap();
        assert_eq!(local_time_of_day("Asia/Kolkata", now), hms(8, 59, 59));
    }

    #[test]
    fn test_new_york_follows_dst() {
        // January: EST (-05:00)
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(local_time_of_day("America/New_York", winter), hms(9, 0, 0));

        // July: EDT (-04:00)
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 14, 0, 0).unwrap();
        assert_eq!(local_time_of_day("America/New_York", summer), hms(10, 0, 0));
    }

    #[test]
    fn test_sub_second_truncated() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(local_time_of_day("UTC", now), hms(9, 0, 0));
    }

    #[test]
    fn test_resolver_uses_configured_fallback() {
        let resolver = TimezoneResolver::new("Europe/Madrid");
        assert_eq!(resolver.effective_timezone(None, None), "Europe/Madrid");
        assert_eq!(
            resolver.effective_timezone(None, Some("  ")),
            "Europe/Madrid"
        );
        assert_eq!(
            resolver.effective_timezone(None, Some("America/Lima")),
            "America/Lima"
        );

        let broken = TimezoneResolver::new("Not/AZone");
        assert_eq!(broken.fallback(), "UTC");
    }
}
