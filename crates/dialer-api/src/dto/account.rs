//! Account DTOs

use chrono::{DateTime, Utc};
use dialer_core::models::Account;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Change an account's default timezone
///
/// The zone name itself is checked against the IANA database when stored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TimezoneUpdateRequest {
    #[validate(length(min = 1, max = 64, message = "Timezone is required"))]
    pub timezone: String,
}

/// Account response
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            timezone: account.timezone,
            updated_at: account.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timezone_request_length() {
        let req: TimezoneUpdateRequest =
            serde_json::from_value(serde_json::json!({ "timezone": "Asia/Kolkata" })).unwrap();
        assert!(req.validate().is_ok());

        let empty = TimezoneUpdateRequest {
            timezone: String::new(),
        };
        assert!(empty.validate().is_err());

        let long = TimezoneUpdateRequest {
            timezone: "X".repeat(65),
        };
        assert!(long.validate().is_err());
    }
}
