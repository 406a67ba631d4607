use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::dto::{
    CreateOrderRequest, CreatedOrder, Credentials, ErrorBody, ForgotPasswordRequest, LoginGrant,
    OrderEnvelope, PasswordReset, RegistrationConfirmation, RegistrationEnvelope,
    VerifiedPayment, VerifyEnvelope,
};
use super::{AuthGateway, GatewayError, RegistrationGateway};
use crate::config::ApiConfig;
use crate::session::AuthToken;
use crate::workflows::registration::{SignedPayment, SubmissionPayload};

const CREATE_ORDER_PATH: &str = "api/payments/create-order";
const VERIFY_PAYMENT_PATH: &str = "api/payments/verify";
const REGISTER_PATH: &str = "api/users/register";
const LOGIN_PATH: &str = "api/auth/login";
const FORGOT_PASSWORD_PATH: &str = "api/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "api/auth/reset-password/";

/// reqwest-backed client for the portal API.
#[derive(Debug, Clone)]
pub struct HttpPortalClient {
    client: reqwest::Client,
    api: ApiConfig,
}

impl HttpPortalClient {
    pub fn new(api: ApiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .build()
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        Ok(Self { client, api })
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.api
            .endpoint(path)
            .map_err(|err| GatewayError::Request(err.to_string()))
    }

    fn post(&self, url: Url, token: Option<&AuthToken>) -> RequestBuilder {
        let request = self
            .client
            .post(url)
            .timeout(self.api.request_timeout);
        match token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    async fn post_json<B, T>(
        &self,
        path: &str,
        token: Option<&AuthToken>,
        body: &B,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!(%url, "posting json request");
        let response = self
            .post(url, token)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

async fn body_bytes(response: Response) -> Result<(reqwest::StatusCode, Vec<u8>), GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_transport)?;
    Ok((status, bytes.to_vec()))
}

fn rejection(status: reqwest::StatusCode, bytes: &[u8]) -> GatewayError {
    let body: ErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
    let message = body
        .error
        .or(body.message)
        .unwrap_or_else(|| format!("backend returned status {status}"));
    warn!(status = status.as_u16(), %message, "backend rejected request");
    GatewayError::Rejected {
        status: Some(status.as_u16()),
        message,
        missing: body.missing,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let (status, bytes) = body_bytes(response).await?;
    if !status.is_success() {
        return Err(rejection(status, &bytes));
    }
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

async fn expect_success(response: Response) -> Result<(), GatewayError> {
    let (status, bytes) = body_bytes(response).await?;
    if status.is_success() {
        Ok(())
    } else {
        Err(rejection(status, &bytes))
    }
}

/// `success: false` inside a 2xx body.
fn declined(error: Option<String>, message: Option<String>, fallback: &str) -> GatewayError {
    GatewayError::rejected(error.or(message).unwrap_or_else(|| fallback.to_string()))
}

fn multipart_form(payload: &SubmissionPayload) -> Result<Form, GatewayError> {
    let mut form = Form::new();
    for (name, value) in payload.fields() {
        form = form.text(name.clone(), value.clone());
    }
    for (kind, attachment) in payload.attachments() {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(attachment.content_type.as_ref())
            .map_err(|err| GatewayError::Request(err.to_string()))?;
        form = form.part(kind.field_name(), part);
    }
    Ok(form)
}

#[async_trait]
impl RegistrationGateway for HttpPortalClient {
    async fn create_order(
        &self,
        token: &AuthToken,
        amount: u32,
        currency: &str,
    ) -> Result<CreatedOrder, GatewayError> {
        let envelope: OrderEnvelope = self
            .post_json(
                CREATE_ORDER_PATH,
                Some(token),
                &CreateOrderRequest { amount, currency },
            )
            .await?;

        match envelope {
            OrderEnvelope {
                success: true,
                order: Some(order),
                ..
            } => Ok(order),
            OrderEnvelope {
                success: true,
                order: None,
                ..
            } => Err(GatewayError::Decode("order missing from response".to_string())),
            OrderEnvelope { error, message, .. } => {
                Err(declined(error, message, "Failed to create order"))
            }
        }
    }

    async fn verify_payment(
        &self,
        token: &AuthToken,
        payment: &SignedPayment,
    ) -> Result<VerifiedPayment, GatewayError> {
        let envelope: VerifyEnvelope = self
            .post_json(VERIFY_PAYMENT_PATH, Some(token), payment)
            .await?;

        match envelope {
            VerifyEnvelope {
                success: true,
                payment: Some(payment),
                ..
            } => Ok(payment),
            VerifyEnvelope {
                success: true,
                payment: None,
                ..
            } => Err(GatewayError::Decode(
                "payment missing from verification response".to_string(),
            )),
            VerifyEnvelope { error, message, .. } => {
                Err(declined(error, message, "Payment verification failed"))
            }
        }
    }

    async fn register(
        &self,
        token: &AuthToken,
        payload: &SubmissionPayload,
    ) -> Result<RegistrationConfirmation, GatewayError> {
        let url = self.url(REGISTER_PATH)?;
        let form = multipart_form(payload)?;
        debug!(
            %url,
            fields = payload.fields().len(),
            files = payload.attachments().len(),
            bytes = payload.total_bytes(),
            "posting registration form"
        );

        let response = self
            .post(url, Some(token))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;
        let envelope: RegistrationEnvelope = decode(response).await?;

        match envelope {
            RegistrationEnvelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            RegistrationEnvelope {
                success: true,
                data: None,
                ..
            } => Err(GatewayError::Decode(
                "registration data missing from response".to_string(),
            )),
            RegistrationEnvelope {
                error,
                message,
                missing,
                ..
            } => Err(GatewayError::Rejected {
                status: None,
                message: error
                    .or(message)
                    .unwrap_or_else(|| "Submission failed".to_string()),
                missing,
            }),
        }
    }
}

#[async_trait]
impl AuthGateway for HttpPortalClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, GatewayError> {
        self.post_json(LOGIN_PATH, None, credentials).await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), GatewayError> {
        let url = self.url(FORGOT_PASSWORD_PATH)?;
        let response = self
            .post(url, None)
            .json(&ForgotPasswordRequest { email })
            .send()
            .await
            .map_err(map_transport)?;
        expect_success(response).await
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        request: &PasswordReset,
    ) -> Result<(), GatewayError> {
        let mut url = self.url(RESET_PASSWORD_PATH)?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Request("API URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(reset_token);

        let response = self
            .post(url, None)
            .json(request)
            .send()
            .await
            .map_err(map_transport)?;
        expect_success(response).await
    }
}
