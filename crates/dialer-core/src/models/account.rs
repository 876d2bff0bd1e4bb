//! Account model
//!
//! The owning user of campaigns and queued calls. Only the default timezone
//! matters to the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: Uuid,

    /// Contact email
    pub email: Option<String>,

    /// Default IANA zone for campaigns without an override
    pub timezone: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The account timezone, if set to something non-blank
    pub fn timezone(&self) -> Option<&str> {
        self.timezone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
    }
}

impl Default for Account {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: None,
            timezone: Some("UTC".to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}
