use async_trait::async_trait;
use registration_portal::workflows::registration::{
    CheckoutEvent, CheckoutRequest, CheckoutResponse, PaymentCheckout,
};
use serde_json::Value;
use tracing::warn;

use crate::infra::prompt;

/// Terminal stand-in for the hosted payment sheet.
///
/// Prints the order, then waits for the JSON the payment page hands back on
/// success. A blank line dismisses; `fail: <reason>` reports a failed payment.
#[derive(Debug, Default)]
pub(crate) struct ConsoleCheckout;

pub(crate) fn interpret(line: &str) -> CheckoutEvent {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("cancel") {
        return CheckoutEvent::Dismissed;
    }
    if let Some(reason) = line.strip_prefix("fail:") {
        return CheckoutEvent::Failed {
            reason: reason.trim().to_string(),
        };
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) => CheckoutEvent::Completed(CheckoutResponse::from_json(&value)),
        Err(err) => {
            warn!(error = %err, "payment response is not JSON");
            CheckoutEvent::Failed {
                reason: "unreadable payment response".to_string(),
            }
        }
    }
}

#[async_trait]
impl PaymentCheckout for ConsoleCheckout {
    async fn collect(&self, request: CheckoutRequest) -> CheckoutEvent {
        println!("\n{}", request.merchant_name);
        println!("  {}", request.description);
        println!("  Amount:   {} {}", request.currency, request.amount);
        println!("  Order:    {}", request.order_id);
        println!(
            "  Payer:    {} <{}> {}",
            request.prefill.name, request.prefill.email, request.prefill.contact
        );
        println!("Complete the payment, then paste the response JSON.");
        println!("Leave blank to cancel, or type `fail: <reason>` if the payment failed.");

        match prompt("payment response> ").await {
            Ok(line) => interpret(&line),
            Err(err) => CheckoutEvent::Failed {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_dismisses() {
        assert_eq!(interpret("   "), CheckoutEvent::Dismissed);
        assert_eq!(interpret("cancel"), CheckoutEvent::Dismissed);
    }

    #[test]
    fn handler_json_becomes_completion() {
        let event = interpret(
            r#"{"razorpay_order_id":"order_1","razorpay_payment_id":"pay_1","razorpay_signature":"sig"}"#,
        );
        assert_eq!(
            event,
            CheckoutEvent::Completed(CheckoutResponse::new("order_1", "pay_1", "sig"))
        );
    }

    #[test]
    fn failures_carry_a_reason() {
        assert_eq!(
            interpret("fail: card declined"),
            CheckoutEvent::Failed {
                reason: "card declined".to_string()
            }
        );
        assert!(matches!(interpret("not json"), CheckoutEvent::Failed { .. }));
    }
}
