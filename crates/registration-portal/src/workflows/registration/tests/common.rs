use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::gateway::{
    CreatedOrder, GatewayError, RegistrationConfirmation, RegistrationGateway, VerifiedPayment,
};
use crate::session::{AuthToken, MemorySessionStore, Session};
use crate::workflows::registration::{
    ApplicationWizard, Attachment, AttachmentKind, Attachments, BasicDetails, CheckoutEvent,
    CheckoutRequest, CheckoutResponse, ConditionalDetails, Gender, PaymentCheckout,
    RegistrationType, SignedPayment, SocialCategory, SubmissionPayload, WizardSettings,
    WizardStep,
};

pub(super) fn basic_details() -> BasicDetails {
    BasicDetails {
        regcategory_id: "1".to_string(),
        nationality_id: "91".to_string(),
        first_name: "Asha".to_string(),
        middle_name: None,
        last_name: "Rao".to_string(),
        gender: Gender::Female,
        father_name: "Venkat Rao".to_string(),
        mother_name: "Lakshmi Rao".to_string(),
        place: "Hyderabad".to_string(),
        date_of_birth: "1998-04-12".to_string(),
        category: SocialCategory::Open,
        email: "asha.rao@example.in".to_string(),
        mobile_number: "9876543210".to_string(),
        telephone_number: None,
        address: "12-3-45, Banjara Hills, Hyderabad".to_string(),
        pan_number: "ABCDE1234F".to_string(),
        aadhaar_number: "123456789012".to_string(),
        regtype: RegistrationType::RegularByPost,
        registration_category: "Regular".to_string(),
    }
}

pub(super) fn uploads() -> Attachments {
    AttachmentKind::REQUIRED
        .into_iter()
        .map(|kind| {
            (
                kind,
                Attachment::pdf(format!("{}.pdf", kind.field_name()), vec![0x25, 0x50, 0x44, 0x46]),
            )
        })
        .collect()
}

pub(super) fn regular_fields() -> ConditionalDetails {
    [
        ("qualification", "BDS"),
        ("university", "KNRUHS"),
        ("college_name", "Government Dental College"),
        ("year_of_passing", "2023"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

pub(super) fn order(id: &str, amount: u32) -> CreatedOrder {
    CreatedOrder {
        id: id.to_string(),
        amount: u64::from(amount) * 100,
        currency: "INR".to_string(),
        receipt: Some("rcpt_1".to_string()),
    }
}

pub(super) fn verified(order_id: &str, payment_id: &str) -> VerifiedPayment {
    VerifiedPayment {
        id: Some("1".to_string()),
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        amount: Some(200_000),
        status: Some("captured".to_string()),
        currency: Some("INR".to_string()),
    }
}

pub(super) fn confirmation(temporary_id: &str) -> RegistrationConfirmation {
    RegistrationConfirmation {
        application_id: Some("APP-1".to_string()),
        temporary_id: temporary_id.to_string(),
        payment_id: Some("pay_1".to_string()),
        status: Some("pending".to_string()),
        amount_paid: Some(2000),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GatewayCall {
    CreateOrder { amount: u32, currency: String },
    Verify { order_id: String, payment_id: String },
    Register { fields: Vec<(String, String)>, files: Vec<AttachmentKind> },
}

/// Backend fake answering from per-endpoint queues; unscripted calls succeed.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    orders: Mutex<VecDeque<Result<CreatedOrder, GatewayError>>>,
    verifications: Mutex<VecDeque<Result<VerifiedPayment, GatewayError>>>,
    registrations: Mutex<VecDeque<Result<RegistrationConfirmation, GatewayError>>>,
    calls: Mutex<Vec<GatewayCall>>,
    /// Yield once before answering so concurrent callers interleave.
    pub(super) yield_first: bool,
}

impl ScriptedGateway {
    pub(super) fn yielding() -> Self {
        Self {
            yield_first: true,
            ..Self::default()
        }
    }

    pub(super) fn push_order(&self, result: Result<CreatedOrder, GatewayError>) {
        self.orders.lock().expect("orders mutex").push_back(result);
    }

    pub(super) fn push_verification(&self, result: Result<VerifiedPayment, GatewayError>) {
        self.verifications
            .lock()
            .expect("verifications mutex")
            .push_back(result);
    }

    pub(super) fn push_registration(&self, result: Result<RegistrationConfirmation, GatewayError>) {
        self.registrations
            .lock()
            .expect("registrations mutex")
            .push_back(result);
    }

    pub(super) fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub(super) fn register_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GatewayCall::Register { .. }))
            .count()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("calls mutex").push(call);
    }

    async fn pause(&self) {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RegistrationGateway for ScriptedGateway {
    async fn create_order(
        &self,
        _token: &AuthToken,
        amount: u32,
        currency: &str,
    ) -> Result<CreatedOrder, GatewayError> {
        self.record(GatewayCall::CreateOrder {
            amount,
            currency: currency.to_string(),
        });
        self.pause().await;
        self.orders
            .lock()
            .expect("orders mutex")
            .pop_front()
            .unwrap_or_else(|| Ok(order("order_1", amount)))
    }

    async fn verify_payment(
        &self,
        _token: &AuthToken,
        payment: &SignedPayment,
    ) -> Result<VerifiedPayment, GatewayError> {
        self.record(GatewayCall::Verify {
            order_id: payment.razorpay_order_id.clone(),
            payment_id: payment.razorpay_payment_id.clone(),
        });
        self.pause().await;
        self.verifications
            .lock()
            .expect("verifications mutex")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(verified(
                    &payment.razorpay_order_id,
                    &payment.razorpay_payment_id,
                ))
            })
    }

    async fn register(
        &self,
        _token: &AuthToken,
        payload: &SubmissionPayload,
    ) -> Result<RegistrationConfirmation, GatewayError> {
        self.record(GatewayCall::Register {
            fields: payload.fields().to_vec(),
            files: payload.attachments().iter().map(|(kind, _)| *kind).collect(),
        });
        self.pause().await;
        self.registrations
            .lock()
            .expect("registrations mutex")
            .pop_front()
            .unwrap_or_else(|| Ok(confirmation("TMP123")))
    }
}

/// Checkout fake replaying scripted events; completes with signed fields by default.
#[derive(Default)]
pub(super) struct ScriptedCheckout {
    events: Mutex<VecDeque<CheckoutEvent>>,
    requests: Mutex<Vec<CheckoutRequest>>,
    hang: AtomicBool,
}

impl ScriptedCheckout {
    /// The next checkout never answers, like a payment sheet left open.
    pub(super) fn hang_next(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub(super) fn push(&self, event: CheckoutEvent) {
        self.events.lock().expect("events mutex").push_back(event);
    }

    pub(super) fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl PaymentCheckout for ScriptedCheckout {
    async fn collect(&self, request: CheckoutRequest) -> CheckoutEvent {
        let order_id = request.order_id.clone();
        self.requests.lock().expect("requests mutex").push(request);
        if self.hang.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.events
            .lock()
            .expect("events mutex")
            .pop_front()
            .unwrap_or_else(|| {
                CheckoutEvent::Completed(CheckoutResponse::new(&order_id, "pay_1", "sig_1"))
            })
    }
}

pub(super) type TestWizard = ApplicationWizard<ScriptedGateway, ScriptedCheckout, MemorySessionStore>;

pub(super) struct Harness {
    pub(super) wizard: TestWizard,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) checkout: Arc<ScriptedCheckout>,
    pub(super) store: Arc<MemorySessionStore>,
}

pub(super) fn harness_with(gateway: ScriptedGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let checkout = Arc::new(ScriptedCheckout::default());
    let store = Arc::new(MemorySessionStore::default());
    let session = Arc::new(Session::new(AuthToken::new("token-1"), None));
    let wizard = ApplicationWizard::new(
        session,
        gateway.clone(),
        checkout.clone(),
        store.clone(),
        WizardSettings::default(),
    );
    Harness {
        wizard,
        gateway,
        checkout,
        store,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(ScriptedGateway::default())
}

/// Walk the wizard through steps 1-3 with valid input.
pub(super) fn advance_to_payment(wizard: &TestWizard) {
    wizard
        .submit_basic_details(basic_details(), uploads())
        .expect("basic details accepted");
    wizard
        .submit_conditional_fields(regular_fields())
        .expect("conditional fields accepted");
    wizard.proceed_to_payment().expect("review confirmed");
    assert_eq!(wizard.step(), WizardStep::Payment);
}
