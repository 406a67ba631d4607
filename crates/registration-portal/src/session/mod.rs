//! Session context shared by the auth service and the application wizard.
//!
//! A [`Session`] is created by a successful login and dropped by logout. The
//! [`SessionStore`] keeps the active session and the receipt of the last
//! submitted application for the confirmation screen.

mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError};

/// Bearer token issued at login. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Account details returned alongside the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: AuthToken,
    #[serde(default)]
    pub user: Option<UserProfile>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: AuthToken, user: Option<UserProfile>) -> Self {
        Self {
            token,
            user,
            started_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.name.as_deref().or(user.email.as_deref()))
            .unwrap_or("Applicant")
    }
}

/// Minimal record of a completed submission, read by the confirmation screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub temporary_id: String,
    pub payment_id: String,
    pub amount: u32,
    #[serde(rename = "registrationCategory")]
    pub registration_category: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn receipt_serializes_with_confirmation_screen_keys() {
        let receipt = Receipt {
            temporary_id: "TMP123".to_string(),
            payment_id: "pay_1".to_string(),
            amount: 2000,
            registration_category: "Regular".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        };
        let value = serde_json::to_value(&receipt).expect("serializes");
        assert_eq!(
            value,
            json!({
                "temporary_id": "TMP123",
                "payment_id": "pay_1",
                "amount": 2000,
                "registrationCategory": "Regular",
                "timestamp": "2025-01-02T03:04:05Z",
            })
        );
    }

    #[test]
    fn token_is_redacted() {
        let session = Session::new(AuthToken::new("secret-token"), None);
        assert!(!format!("{session:?}").contains("secret-token"));
        assert_eq!(session.display_name(), "Applicant");
    }
}
