//! Typed access to the portal backend.
//!
//! The wizard and the auth service only see the two traits below, so both can
//! be exercised against in-memory fakes. [`HttpPortalClient`] is the
//! production implementation.

pub mod dto;
mod http;

use async_trait::async_trait;

use crate::session::AuthToken;
use crate::workflows::registration::{SignedPayment, SubmissionPayload};

pub use dto::{
    CreatedOrder, Credentials, LoginGrant, PasswordReset, RegistrationConfirmation,
    VerifiedPayment,
};
pub use http::HttpPortalClient;

/// Failure talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The backend answered and said no.
    #[error("{message}")]
    Rejected {
        status: Option<u16>,
        message: String,
        missing: Vec<String>,
    },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Transport(String),
    #[error("could not build request: {0}")]
    Request(String),
    #[error("unexpected response from backend: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            status: None,
            message: message.into(),
            missing: Vec::new(),
        }
    }

    /// True when no backend answer was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Transport(_))
    }

    pub fn missing_fields(&self) -> &[String] {
        match self {
            GatewayError::Rejected { missing, .. } => missing,
            _ => &[],
        }
    }
}

/// Payment and registration endpoints used by the application wizard.
#[async_trait]
pub trait RegistrationGateway: Send + Sync {
    async fn create_order(
        &self,
        token: &AuthToken,
        amount: u32,
        currency: &str,
    ) -> Result<CreatedOrder, GatewayError>;

    async fn verify_payment(
        &self,
        token: &AuthToken,
        payment: &SignedPayment,
    ) -> Result<VerifiedPayment, GatewayError>;

    async fn register(
        &self,
        token: &AuthToken,
        payload: &SubmissionPayload,
    ) -> Result<RegistrationConfirmation, GatewayError>;
}

/// Unauthenticated account endpoints.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, GatewayError>;

    async fn forgot_password(&self, email: &str) -> Result<(), GatewayError>;

    async fn reset_password(
        &self,
        reset_token: &str,
        request: &PasswordReset,
    ) -> Result<(), GatewayError>;
}
