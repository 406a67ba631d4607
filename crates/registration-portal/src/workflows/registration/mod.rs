//! Multi-step application wizard: basic details, category-specific fields,
//! review, then payment and final submission.
//!
//! [`ApplicationWizard`] owns the state machine. Validation, the step-2
//! schema, fee lookup, checkout handoff and payload assembly live in their own
//! modules so each can be tested without the controller.

pub mod checkout;
pub mod controller;
pub mod domain;
pub mod error;
pub mod fee;
pub mod schema;
pub mod submission;
pub mod validation;

#[cfg(test)]
mod tests;

pub use checkout::{
    CheckoutEvent, CheckoutPrefill, CheckoutRequest, CheckoutResponse, PaymentCheckout,
    PaymentIntent, SignedPayment,
};
pub use controller::{ApplicationWizard, PaymentOutcome, WizardSettings, WizardState};
pub use domain::{
    Attachment, AttachmentKind, Attachments, BasicDetails, ConditionalDetails, Draft, Gender,
    RegistrationType, SocialCategory, WizardStep,
};
pub use error::WizardError;
pub use fee::{FeeSchedule, DEFAULT_REGISTRATION_FEE};
pub use schema::{ConditionalFieldSchema, FieldKind, FieldRequirement};
pub use submission::SubmissionPayload;
pub use validation::{validate_basic_details, ValidationErrors};
