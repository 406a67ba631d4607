use super::domain::{AttachmentKind, WizardStep};
use super::validation::ValidationErrors;
use crate::gateway::GatewayError;

const CONNECTION_HINT: &str = "Please check your connection and try again.";

fn join_kinds(kinds: &[AttachmentKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.field_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every failure the wizard can report. None of them end the flow; each
/// leaves the applicant on a step they can act from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("cannot {action} from step {step:?}")]
    InvalidTransition {
        step: WizardStep,
        action: &'static str,
    },
    #[error("a payment or submission is already in progress")]
    OperationInFlight,
    #[error("payment has been verified; the application can no longer be edited")]
    PaymentAlreadyConfirmed,
    #[error("failed to create order: {0}")]
    OrderCreation(GatewayError),
    #[error("payment failed: {reason}")]
    CheckoutFailed { reason: String },
    #[error("payment response is missing {}", .missing.join(", "))]
    MalformedPaymentResponse { missing: Vec<&'static str> },
    #[error("payment verification failed: {0}")]
    PaymentVerification(GatewayError),
    #[error("missing required files: {}", join_kinds(.0))]
    MissingAttachments(Vec<AttachmentKind>),
    #[error("failed to submit application: {0}")]
    Submission(GatewayError),
}

impl WizardError {
    /// Text for the error banner shown next to the current step.
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            WizardError::InvalidTransition { .. } => {
                "That action is not available on this step.".to_string()
            }
            WizardError::OperationInFlight => {
                "Please wait for the current payment to finish.".to_string()
            }
            WizardError::PaymentAlreadyConfirmed => {
                "Payment is complete; the application can no longer be changed.".to_string()
            }
            WizardError::OrderCreation(err) if err.is_transport() => {
                format!("Failed to initialize payment. {CONNECTION_HINT}")
            }
            WizardError::OrderCreation(err) => format!("Failed to initialize payment. {err}"),
            WizardError::CheckoutFailed { reason } => format!("Payment failed: {reason}"),
            WizardError::MalformedPaymentResponse { .. } => {
                "Invalid payment response from gateway. Please contact support.".to_string()
            }
            WizardError::PaymentVerification(err) if err.is_transport() => {
                format!("Payment verification failed. {CONNECTION_HINT}")
            }
            WizardError::PaymentVerification(err) => {
                format!("Payment verification failed. {err}")
            }
            WizardError::MissingAttachments(kinds) => format!(
                "Missing required files: {}. Please upload them again and retry the submission.",
                join_kinds(kinds)
            ),
            WizardError::Submission(err) if err.is_transport() => {
                format!("Failed to submit application. {CONNECTION_HINT}")
            }
            WizardError::Submission(err) => {
                let mut message = format!("Failed to submit application. {err}");
                let missing = err.missing_fields();
                if !missing.is_empty() {
                    message.push_str(&format!(
                        "\nMissing files: {}. Upload them again and retry the submission.",
                        missing.join(", ")
                    ));
                }
                message
            }
        }
    }

    /// Documents the applicant has to upload again before retrying.
    pub fn attachments_to_reupload(&self) -> Vec<AttachmentKind> {
        match self {
            WizardError::MissingAttachments(kinds) => kinds.clone(),
            WizardError::Submission(err) => AttachmentKind::REQUIRED
                .into_iter()
                .filter(|kind| {
                    err.missing_fields()
                        .iter()
                        .any(|field| field == kind.field_name())
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            WizardError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_message_lists_backend_missing_fields() {
        let err = WizardError::Submission(GatewayError::Rejected {
            status: Some(400),
            message: "Required documents missing".to_string(),
            missing: vec!["pan_upload".to_string(), "sign_upload".to_string()],
        });
        assert_eq!(
            err.user_message(),
            "Failed to submit application. Required documents missing\nMissing files: pan_upload, sign_upload. Upload them again and retry the submission."
        );
    }

    #[test]
    fn transport_failures_get_generic_message() {
        let err = WizardError::PaymentVerification(GatewayError::Timeout);
        assert_eq!(
            err.user_message(),
            "Payment verification failed. Please check your connection and try again."
        );
    }

    #[test]
    fn backend_missing_list_maps_to_upload_kinds() {
        let err = WizardError::Submission(GatewayError::Rejected {
            status: Some(400),
            message: "Required documents missing".to_string(),
            missing: vec!["sign_upload".to_string(), "photo".to_string()],
        });
        assert_eq!(err.attachments_to_reupload(), vec![AttachmentKind::Signature]);
        assert!(WizardError::Submission(GatewayError::Timeout)
            .attachments_to_reupload()
            .is_empty());
    }

    #[test]
    fn missing_attachments_name_the_fields() {
        let err = WizardError::MissingAttachments(vec![AttachmentKind::Signature]);
        assert_eq!(err.to_string(), "missing required files: sign_upload");
    }
}
