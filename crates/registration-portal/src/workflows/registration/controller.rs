use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::checkout::{
    CheckoutEvent, CheckoutPrefill, CheckoutRequest, PaymentCheckout, PaymentIntent,
};
use super::domain::{Attachments, BasicDetails, ConditionalDetails, Draft, WizardStep};
use super::error::WizardError;
use super::fee::FeeSchedule;
use super::schema::ConditionalFieldSchema;
use super::submission::SubmissionPayload;
use super::validation::{validate_basic_details, ValidationErrors};
use crate::config::ApiConfig;
use crate::gateway::{GatewayError, RegistrationGateway, VerifiedPayment};
use crate::session::{Receipt, Session, SessionStore};

/// Policy inputs for the wizard.
#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub currency: String,
    pub merchant_name: String,
    pub fees: FeeSchedule,
    pub schema: ConditionalFieldSchema,
}

impl WizardSettings {
    pub fn from_api(api: &ApiConfig) -> Self {
        Self {
            currency: api.currency.clone(),
            merchant_name: api.merchant_name.clone(),
            ..Self::default()
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            currency: api.currency,
            merchant_name: api.merchant_name,
            fees: FeeSchedule::default(),
            schema: ConditionalFieldSchema::default(),
        }
    }
}

/// Snapshot of the wizard as a front end renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub step: WizardStep,
    pub draft: Draft,
    pub in_flight: bool,
    pub last_error: Option<String>,
    pub field_errors: ValidationErrors,
    pub payment_intent: Option<PaymentIntent>,
    /// Set once the backend verified the payment; survives failed submissions.
    pub confirmed_payment: Option<VerifiedPayment>,
    pub receipt: Option<Receipt>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: WizardStep::BasicDetails,
            draft: Draft::default(),
            in_flight: false,
            last_error: None,
            field_errors: ValidationErrors::new(),
            payment_intent: None,
            confirmed_payment: None,
            receipt: None,
        }
    }
}

/// Result of a payment or submission attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Submitted(Receipt),
    /// The applicant closed the checkout; nothing was recorded.
    Dismissed,
    /// Another attempt is already running; this call did nothing.
    InFlight,
}

/// What a payment or submission attempt starts from, copied out of the state.
struct Ticket {
    draft: Draft,
    confirmed: Option<VerifiedPayment>,
}

/// Holds the in-flight flag for one payment or submission attempt.
///
/// Finished attempts clear the flag themselves. If the attempt's future is
/// dropped first, the guard clears it along with the half-open payment intent
/// so the wizard stays usable.
struct InFlight<'a> {
    state: &'a Mutex<WizardState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight {
            warn!("payment flow attempt abandoned before it finished");
            state.in_flight = false;
            state.payment_intent = None;
        }
    }
}

/// Drives the four-step application flow and the payment handoff.
pub struct ApplicationWizard<G, C, S> {
    session: Arc<Session>,
    gateway: Arc<G>,
    checkout: Arc<C>,
    store: Arc<S>,
    settings: WizardSettings,
    state: Mutex<WizardState>,
}

impl<G, C, S> ApplicationWizard<G, C, S>
where
    G: RegistrationGateway + 'static,
    C: PaymentCheckout + 'static,
    S: SessionStore + 'static,
{
    pub fn new(
        session: Arc<Session>,
        gateway: Arc<G>,
        checkout: Arc<C>,
        store: Arc<S>,
        settings: WizardSettings,
    ) -> Self {
        Self {
            session,
            gateway,
            checkout,
            store,
            settings,
            state: Mutex::new(WizardState::default()),
        }
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    pub fn state(&self) -> WizardState {
        self.lock().clone()
    }

    pub fn step(&self) -> WizardStep {
        self.lock().step
    }

    #[cfg(test)]
    pub(super) fn edit_draft(&self, edit: impl FnOnce(&mut Draft)) {
        edit(&mut self.lock().draft);
    }

    fn lock(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expect_step(state: &WizardState, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if state.in_flight {
            return Err(WizardError::OperationInFlight);
        }
        if state.step != step {
            return Err(WizardError::InvalidTransition {
                step: state.step,
                action,
            });
        }
        Ok(())
    }

    fn reject_fields(state: &mut WizardState, errors: ValidationErrors) -> WizardError {
        let error = WizardError::Validation(errors.clone());
        state.last_error = Some(error.user_message());
        state.field_errors = errors;
        error
    }

    /// Step 1. `uploads` replace attachments already in the draft kind by kind.
    pub fn submit_basic_details(
        &self,
        details: BasicDetails,
        uploads: Attachments,
    ) -> Result<(), WizardError> {
        let mut state = self.lock();
        Self::expect_step(&state, WizardStep::BasicDetails, "submit basic details")?;

        let details = details.normalized();
        let mut attachments = state.draft.attachments.clone();
        attachments.extend(uploads);

        let mut errors = match validate_basic_details(&details, &attachments) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if !self.settings.schema.knows(&details.registration_category) {
            errors.add(
                "registrationCategory",
                format!(
                    "Unsupported registration category '{}'",
                    details.registration_category
                ),
            );
        }
        if !errors.is_empty() {
            warn!(fields = errors.len(), "basic details rejected");
            return Err(Self::reject_fields(&mut state, errors));
        }

        debug!(
            category = %details.registration_category,
            attachments = attachments.len(),
            "basic details accepted"
        );
        state.draft.basic = Some(details);
        state.draft.attachments = attachments;
        state.field_errors = ValidationErrors::new();
        state.last_error = None;
        state.step = WizardStep::ConditionalFields;
        info!(step = state.step.index(), "wizard advanced");
        Ok(())
    }

    /// Step 2. Replaces any conditional fields captured earlier and prices the application.
    pub fn submit_conditional_fields(&self, details: ConditionalDetails) -> Result<(), WizardError> {
        let mut state = self.lock();
        Self::expect_step(
            &state,
            WizardStep::ConditionalFields,
            "submit conditional fields",
        )?;

        let Some((regtype, category)) = state
            .draft
            .basic
            .as_ref()
            .map(|basic| (basic.regtype, basic.registration_category.clone()))
        else {
            return Err(WizardError::InvalidTransition {
                step: state.step,
                action: "submit conditional fields without basic details",
            });
        };

        if let Err(errors) = self.settings.schema.validate(&category, &details) {
            warn!(%category, fields = errors.len(), "conditional fields rejected");
            return Err(Self::reject_fields(&mut state, errors));
        }

        let amount = self.settings.fees.fee(regtype, &category);
        state.draft.conditional = details;
        state.draft.amount = Some(amount);
        state.field_errors = ValidationErrors::new();
        state.last_error = None;
        state.step = WizardStep::Review;
        info!(step = state.step.index(), amount, %category, "wizard advanced");
        Ok(())
    }

    /// Review is read-only; confirming it opens the payment step.
    pub fn proceed_to_payment(&self) -> Result<(), WizardError> {
        let mut state = self.lock();
        Self::expect_step(&state, WizardStep::Review, "proceed to payment")?;
        state.step = WizardStep::Payment;
        state.last_error = None;
        info!(step = state.step.index(), "wizard advanced");
        Ok(())
    }

    pub fn back(&self) -> Result<WizardStep, WizardError> {
        let mut state = self.lock();
        if state.in_flight {
            return Err(WizardError::OperationInFlight);
        }

        let previous = match state.step {
            WizardStep::ConditionalFields => WizardStep::BasicDetails,
            WizardStep::Review => WizardStep::ConditionalFields,
            WizardStep::Payment if state.confirmed_payment.is_some() => {
                return Err(WizardError::PaymentAlreadyConfirmed)
            }
            WizardStep::Payment => {
                state.payment_intent = None;
                WizardStep::Review
            }
            step @ (WizardStep::BasicDetails | WizardStep::Submitted) => {
                return Err(WizardError::InvalidTransition {
                    step,
                    action: "go back",
                })
            }
        };

        state.step = previous;
        state.field_errors = ValidationErrors::new();
        info!(step = previous.index(), "wizard moved back");
        Ok(previous)
    }

    /// Upload documents again on the payment step. Needed when a submission
    /// after a verified payment finds files missing, since the earlier steps
    /// are closed by then. The verified payment is kept.
    pub fn replace_attachments(&self, uploads: Attachments) -> Result<(), WizardError> {
        let mut state = self.lock();
        Self::expect_step(&state, WizardStep::Payment, "replace attachments")?;
        if uploads.is_empty() {
            return Err(Self::reject_fields(
                &mut state,
                ValidationErrors::single("attachments", "Choose at least one file to upload"),
            ));
        }

        let kinds: Vec<_> = uploads.keys().copied().collect();
        state.draft.attachments.extend(uploads);
        state.field_errors = ValidationErrors::new();
        state.last_error = None;
        info!(
            ?kinds,
            payment_verified = state.confirmed_payment.is_some(),
            "attachments replaced"
        );
        Ok(())
    }

    pub fn dismiss_error(&self) {
        let mut state = self.lock();
        state.last_error = None;
    }

    /// Run the payment handoff and, once verified, submit the application.
    ///
    /// If a verified payment is already on record the checkout is skipped and
    /// only the submission runs.
    pub async fn pay(&self) -> Result<PaymentOutcome, WizardError> {
        let Some((ticket, _flight)) = self.begin("pay")? else {
            return Ok(PaymentOutcome::InFlight);
        };

        let verified = match ticket.confirmed {
            Some(verified) => {
                info!(payment_id = %verified.payment_id, "payment already verified, submitting");
                verified
            }
            None => match self.collect_payment(&ticket.draft).await? {
                Some(verified) => verified,
                None => return Ok(PaymentOutcome::Dismissed),
            },
        };

        self.submit(verified).await
    }

    /// Submit again after a failed submission, reusing the verified payment.
    pub async fn retry_submission(&self) -> Result<PaymentOutcome, WizardError> {
        let Some((ticket, _flight)) = self.begin("retry submission")? else {
            return Ok(PaymentOutcome::InFlight);
        };

        match ticket.confirmed {
            Some(verified) => self.submit(verified).await,
            None => {
                let mut state = self.lock();
                state.in_flight = false;
                Err(WizardError::InvalidTransition {
                    step: state.step,
                    action: "retry submission before payment is verified",
                })
            }
        }
    }

    /// Claim the in-flight flag. `None` means another attempt holds it.
    fn begin(&self, action: &'static str) -> Result<Option<(Ticket, InFlight<'_>)>, WizardError> {
        let mut state = self.lock();
        if state.in_flight {
            debug!(action, "ignored while another operation is in flight");
            return Ok(None);
        }
        if state.step != WizardStep::Payment {
            return Err(WizardError::InvalidTransition {
                step: state.step,
                action,
            });
        }

        state.in_flight = true;
        state.last_error = None;
        let ticket = Ticket {
            draft: state.draft.clone(),
            confirmed: state.confirmed_payment.clone(),
        };
        Ok(Some((ticket, InFlight { state: &self.state })))
    }

    /// Release the flag and record the error banner.
    fn fail<T>(&self, error: WizardError) -> Result<T, WizardError> {
        warn!(%error, "payment flow attempt failed");
        let mut state = self.lock();
        state.in_flight = false;
        state.last_error = Some(error.user_message());
        Err(error)
    }

    /// Steps 1-4 of the handoff. `Ok(None)` when the applicant dismissed the checkout.
    async fn collect_payment(&self, draft: &Draft) -> Result<Option<VerifiedPayment>, WizardError> {
        let category = draft
            .registration_category()
            .unwrap_or_default()
            .to_string();
        let amount = match (draft.amount, draft.basic.as_ref()) {
            (Some(amount), _) => amount,
            (None, Some(basic)) => self.settings.fees.fee(basic.regtype, &category),
            (None, None) => self.settings.fees.base(),
        };

        let order = match self
            .gateway
            .create_order(&self.session.token, amount, &self.settings.currency)
            .await
        {
            Ok(order) => order,
            Err(err) => return self.fail(WizardError::OrderCreation(err)),
        };
        info!(order_id = %order.id, amount, "order created");

        // The order is what the applicant is charged; it must match the fee shown on review.
        let expected = u64::from(amount) * 100;
        if order.amount != expected {
            return self.fail(WizardError::OrderCreation(GatewayError::Decode(format!(
                "order {} is for {} but the fee is {expected}",
                order.id, order.amount
            ))));
        }

        let intent = PaymentIntent {
            order_id: order.id.clone(),
            amount,
            currency: order.currency.clone(),
            registration_category: category.clone(),
        };
        self.lock().payment_intent = Some(intent);

        let request = self.checkout_request(draft, &order.id, amount, &order.currency, &category);
        let response = match self.checkout.collect(request).await {
            CheckoutEvent::Completed(response) => response,
            CheckoutEvent::Dismissed => {
                info!(order_id = %order.id, "checkout dismissed");
                let mut state = self.lock();
                state.in_flight = false;
                state.payment_intent = None;
                return Ok(None);
            }
            CheckoutEvent::Failed { reason } => {
                self.lock().payment_intent = None;
                return self.fail(WizardError::CheckoutFailed { reason });
            }
        };

        let signed = match response.into_signed() {
            Ok(signed) => signed,
            Err(missing) => {
                return self.fail(WizardError::MalformedPaymentResponse { missing });
            }
        };

        let verified = match self
            .gateway
            .verify_payment(&self.session.token, &signed)
            .await
        {
            Ok(verified) => verified,
            Err(err) => {
                self.lock().payment_intent = None;
                return self.fail(WizardError::PaymentVerification(err));
            }
        };
        info!(payment_id = %verified.payment_id, "payment verified");

        let mut state = self.lock();
        state.confirmed_payment = Some(verified.clone());
        state.payment_intent = None;
        Ok(Some(verified))
    }

    fn checkout_request(
        &self,
        draft: &Draft,
        order_id: &str,
        amount: u32,
        currency: &str,
        category: &str,
    ) -> CheckoutRequest {
        let prefill = draft
            .basic
            .as_ref()
            .map(|basic| CheckoutPrefill {
                name: basic.applicant_name(),
                email: basic.email.clone(),
                contact: basic.mobile_number.clone(),
            })
            .unwrap_or_else(|| CheckoutPrefill {
                name: "Applicant".to_string(),
                ..CheckoutPrefill::default()
            });

        let label = if category.is_empty() {
            "Registration"
        } else {
            category
        };

        let mut notes = BTreeMap::new();
        notes.insert("registration_category".to_string(), category.to_string());
        notes.insert(
            "application_type".to_string(),
            "New Registration".to_string(),
        );

        CheckoutRequest {
            order_id: order_id.to_string(),
            amount,
            currency: currency.to_string(),
            merchant_name: self.settings.merchant_name.clone(),
            description: format!("Registration Fee for {label}"),
            prefill,
            notes,
        }
    }

    /// Steps 5-7: assemble, post, record the receipt.
    async fn submit(&self, verified: VerifiedPayment) -> Result<PaymentOutcome, WizardError> {
        // Read the draft as it is now, after the checkout round trip.
        let draft = self.lock().draft.clone();

        let payload = match SubmissionPayload::assemble(&draft, &verified) {
            Ok(payload) => payload,
            Err(missing) => return self.fail(WizardError::MissingAttachments(missing)),
        };

        let confirmation = match self
            .gateway
            .register(&self.session.token, &payload)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(err) => return self.fail(WizardError::Submission(err)),
        };

        let receipt = Receipt {
            temporary_id: confirmation.temporary_id,
            payment_id: confirmation
                .payment_id
                .unwrap_or_else(|| verified.payment_id.clone()),
            amount: draft.amount.unwrap_or_else(|| self.settings.fees.base()),
            registration_category: draft
                .registration_category()
                .unwrap_or_default()
                .to_string(),
            timestamp: Utc::now(),
        };

        if let Err(err) = self.store.store_receipt(&receipt) {
            warn!(error = %err, "application submitted but receipt could not be stored");
        }

        let mut state = self.lock();
        state.step = WizardStep::Submitted;
        state.in_flight = false;
        state.last_error = None;
        state.draft = Draft::default();
        state.confirmed_payment = None;
        state.receipt = Some(receipt.clone());
        info!(temporary_id = %receipt.temporary_id, "application submitted");
        Ok(PaymentOutcome::Submitted(receipt))
    }
}
