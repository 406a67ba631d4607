use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Order issued by the backend for the fee currently due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub order_id: String,
    /// Whole rupees.
    pub amount: u32,
    pub currency: String,
    pub registration_category: String,
}

/// Everything the external checkout needs to open its payment sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub amount: u32,
    pub currency: String,
    pub merchant_name: String,
    pub description: String,
    pub prefill: CheckoutPrefill,
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// The one event the checkout reports back for a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    Completed(CheckoutResponse),
    Dismissed,
    Failed { reason: String },
}

/// Raw completion fields as handed over by the checkout; any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    #[serde(skip_serializing)]
    pub razorpay_signature: Option<String>,
}

const ORDER_KEYS: [&str; 4] = ["razorpay_order_id", "razorpayOrderId", "order_id", "orderId"];
const PAYMENT_KEYS: [&str; 4] = [
    "razorpay_payment_id",
    "razorpayPaymentId",
    "payment_id",
    "paymentId",
];
const SIGNATURE_KEYS: [&str; 3] = ["razorpay_signature", "razorpaySignature", "signature"];

fn first_present(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
}

impl CheckoutResponse {
    pub fn new(order_id: &str, payment_id: &str, signature: &str) -> Self {
        Self {
            razorpay_order_id: Some(order_id.to_string()),
            razorpay_payment_id: Some(payment_id.to_string()),
            razorpay_signature: Some(signature.to_string()),
        }
    }

    /// Read a handler payload, accepting the camelCase and short aliases the SDK emits.
    pub fn from_json(value: &Value) -> Self {
        Self {
            razorpay_order_id: first_present(value, &ORDER_KEYS),
            razorpay_payment_id: first_present(value, &PAYMENT_KEYS),
            razorpay_signature: first_present(value, &SIGNATURE_KEYS),
        }
    }

    /// Names of the signed fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("razorpay_order_id", &self.razorpay_order_id),
            ("razorpay_payment_id", &self.razorpay_payment_id),
            ("razorpay_signature", &self.razorpay_signature),
        ] {
            if value.as_deref().map_or(true, |inner| inner.trim().is_empty()) {
                missing.push(name);
            }
        }
        missing
    }

    pub fn into_signed(self) -> Result<SignedPayment, Vec<&'static str>> {
        let missing = self.missing_fields();
        match (
            self.razorpay_order_id,
            self.razorpay_payment_id,
            self.razorpay_signature,
        ) {
            (Some(order_id), Some(payment_id), Some(signature)) if missing.is_empty() => {
                Ok(SignedPayment {
                    razorpay_order_id: order_id,
                    razorpay_payment_id: payment_id,
                    razorpay_signature: signature,
                })
            }
            _ => Err(missing),
        }
    }
}

/// Completion fields with all three signed values present.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignedPayment {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl fmt::Debug for SignedPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedPayment")
            .field("razorpay_order_id", &self.razorpay_order_id)
            .field("razorpay_payment_id", &self.razorpay_payment_id)
            .field("razorpay_signature", &"<redacted>")
            .finish()
    }
}

/// External payment UI. The controller awaits exactly one event per call.
#[async_trait]
pub trait PaymentCheckout: Send + Sync {
    async fn collect(&self, request: CheckoutRequest) -> CheckoutEvent;
}
