//! Request and response bodies of the portal backend.

use serde::{Deserialize, Serialize};

use crate::session::UserProfile;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateOrderRequest<'a> {
    pub amount: u32,
    pub currency: &'a str,
}

/// Order record issued by the payments endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderEnvelope {
    pub success: bool,
    #[serde(default)]
    pub order: Option<CreatedOrder>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payment record confirmed by the backend after signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    #[serde(default)]
    pub id: Option<String>,
    pub order_id: String,
    pub payment_id: String,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyEnvelope {
    pub success: bool,
    #[serde(default)]
    pub payment: Option<VerifiedPayment>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Identifiers assigned to an accepted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationConfirmation {
    #[serde(default)]
    pub application_id: Option<String>,
    pub temporary_id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_paid: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<RegistrationConfirmation>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub missing: Vec<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub missing: Vec<String>,
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Clone, Serialize)]
pub struct PasswordReset {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordReset")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
