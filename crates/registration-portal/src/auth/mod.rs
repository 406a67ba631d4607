//! Sign-in, sign-out and password recovery.

use std::sync::Arc;

use tracing::{info, warn};

use crate::gateway::{AuthGateway, Credentials, GatewayError, PasswordReset};
use crate::session::{AuthToken, Session, SessionStore, SessionStoreError};
use crate::workflows::registration::validation::is_valid_email;
use crate::workflows::registration::ValidationErrors;

/// Shown after a reset request whether or not the address is registered.
pub const FORGOT_PASSWORD_NOTICE: &str = "If your email is registered, you will receive a password reset link within a few minutes. Please check your inbox and spam folder.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("this reset link has expired or is invalid")]
    ResetLinkExpired,
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Gateway(GatewayError),
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(errors) => errors
                .fields()
                .next()
                .map(|(_, message)| message.to_string())
                .unwrap_or_else(|| "Please correct the highlighted fields.".to_string()),
            AuthError::InvalidCredentials(message) => message.clone(),
            AuthError::ResetLinkExpired => "This reset link has expired or is invalid.".to_string(),
            AuthError::NotSignedIn => "Please sign in first.".to_string(),
            AuthError::Gateway(err) if err.is_transport() => {
                "Network error. Please check your connection and try again.".to_string()
            }
            AuthError::Gateway(err) => err.to_string(),
            AuthError::Session(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email.trim()) {
        errors.add("email", "Please enter a valid email address.");
    }
}

/// 8-64 characters with a lowercase letter, an uppercase letter, a digit and a symbol.
pub fn is_strong_password(password: &str) -> bool {
    let length = password.chars().count();
    (8..=64).contains(&length)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

/// Account operations backed by the auth endpoints and the session store.
pub struct AuthService<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
}

impl<G, S> AuthService<G, S>
where
    G: AuthGateway + 'static,
    S: SessionStore + 'static,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self { gateway, store }
    }

    /// Start a session and persist it.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(ValidationErrors::single(
                "credentials",
                "Email and password are required.",
            )));
        }
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, email);
        errors.into_result().map_err(AuthError::Validation)?;

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let grant = match self.gateway.login(&credentials).await {
            Ok(grant) => grant,
            Err(GatewayError::Rejected { message, .. }) => {
                warn!(email = %credentials.email, "login rejected");
                let message = if message.trim().is_empty() {
                    "Login failed. Please check your credentials.".to_string()
                } else {
                    message
                };
                return Err(AuthError::InvalidCredentials(message));
            }
            Err(err) => return Err(AuthError::Gateway(err)),
        };

        let session = Session::new(AuthToken::new(grant.token), grant.user);
        self.store.store_session(&session)?;
        info!(email = %credentials.email, "signed in");
        Ok(session)
    }

    /// The persisted session, if one is active.
    pub fn current_session(&self) -> Result<Session, AuthError> {
        self.store.load_session()?.ok_or(AuthError::NotSignedIn)
    }

    /// End the session and forget everything tied to it.
    pub fn logout(&self, session: Session) -> Result<(), AuthError> {
        self.store.clear()?;
        info!(started_at = %session.started_at, "signed out");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<&'static str, AuthError> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, email);
        errors.into_result().map_err(AuthError::Validation)?;

        self.gateway
            .forgot_password(email.trim())
            .await
            .map_err(AuthError::Gateway)?;
        Ok(FORGOT_PASSWORD_NOTICE)
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let mut errors = ValidationErrors::new();
        if reset_token.trim().is_empty() {
            errors.add("token", "Invalid or missing reset token");
        }
        check_email(&mut errors, email);
        if password.is_empty() {
            errors.add("password", "Password is required");
        } else if !is_strong_password(password) {
            errors.add(
                "password",
                "Password must include uppercase, lowercase, number & special character",
            );
        }
        if password != confirm_password {
            errors.add("confirmPassword", "Passwords do not match");
        }
        errors.into_result().map_err(AuthError::Validation)?;

        let request = PasswordReset {
            email: email.trim().to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        };
        match self
            .gateway
            .reset_password(reset_token.trim(), &request)
            .await
        {
            Ok(()) => {
                info!(email = %request.email, "password reset");
                Ok(())
            }
            Err(GatewayError::Rejected { message, .. })
                if message.contains("expired") || message.contains("invalid") =>
            {
                Err(AuthError::ResetLinkExpired)
            }
            Err(err) => Err(AuthError::Gateway(err)),
        }
    }
}
