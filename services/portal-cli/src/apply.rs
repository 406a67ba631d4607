use std::fs;
use std::path::Path;
use std::sync::Arc;

use registration_portal::auth::AuthError;
use registration_portal::error::AppError;
use registration_portal::gateway::RegistrationGateway;
use registration_portal::session::{Receipt, SessionStore};
use registration_portal::workflows::registration::{
    ApplicationWizard, AttachmentKind, Attachments, BasicDetails, ConditionalDetails,
    ConditionalFieldSchema, FeeSchedule, PaymentCheckout, PaymentOutcome, WizardError,
    WizardSettings, WizardState,
};
use serde::Deserialize;
use tracing::info;

use crate::checkout::ConsoleCheckout;
use crate::cli::{ApplyArgs, FeeArgs};
use crate::infra::{confirm, load_attachment, load_attachments, prompt, Context};

/// Form file accepted by `portal apply`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationForm {
    pub(crate) basic: BasicDetails,
    #[serde(default)]
    pub(crate) conditional: ConditionalDetails,
}

fn report(err: WizardError) -> AppError {
    if let Some(errors) = err.validation_errors() {
        for (field, message) in errors.fields() {
            eprintln!("  {field}: {message}");
        }
    }
    err.into()
}

fn render_review(state: &WizardState) {
    let draft = &state.draft;
    println!("\nReview your application");
    if let Some(basic) = &draft.basic {
        println!("  Applicant:     {}", basic.applicant_name());
        println!("  Date of birth: {}", basic.date_of_birth);
        println!("  Email:         {}", basic.email);
        println!("  Mobile:        {}", basic.mobile_number);
        println!("  Category:      {}", basic.registration_category);
        println!("  Registration:  {}", basic.regtype);
    }
    for (name, value) in &draft.conditional {
        println!("  {name}: {value}");
    }
    for (kind, attachment) in &draft.attachments {
        println!(
            "  {kind}: {} ({} bytes)",
            attachment.file_name,
            attachment.size()
        );
    }
    if let Some(amount) = draft.amount {
        println!("  Fee:           INR {amount}");
    }
}

fn render_receipt(receipt: &Receipt) {
    println!("\nApplication submitted");
    println!("  Temporary ID: {}", receipt.temporary_id);
    println!("  Payment ID:   {}", receipt.payment_id);
    println!("  Amount:       INR {}", receipt.amount);
    println!("  Category:     {}", receipt.registration_category);
    println!("  Submitted at: {}", receipt.timestamp.to_rfc3339());
}

pub(crate) async fn run(args: ApplyArgs) -> Result<(), AppError> {
    let context = Context::load()?;
    let session = match context.auth().current_session() {
        Ok(session) => session,
        Err(AuthError::NotSignedIn) => {
            return Err(AppError::Input(
                "not signed in; run `portal login` first".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    };

    let form: ApplicationForm = serde_json::from_slice(&fs::read(&args.form)?).map_err(|err| {
        AppError::Input(format!("{} is not a valid form: {err}", args.form.display()))
    })?;
    let uploads = load_attachments([
        (AttachmentKind::Pan, args.pan.as_deref()),
        (AttachmentKind::Aadhaar, args.aadhaar.as_deref()),
        (AttachmentKind::Signature, args.signature.as_deref()),
    ])?;

    let wizard = ApplicationWizard::new(
        Arc::new(session),
        context.client.clone(),
        Arc::new(ConsoleCheckout),
        context.store.clone(),
        WizardSettings::from_api(&context.config.api),
    );

    wizard
        .submit_basic_details(form.basic, uploads)
        .map_err(report)?;
    wizard
        .submit_conditional_fields(form.conditional)
        .map_err(report)?;

    render_review(&wizard.state());
    if !args.yes && !confirm("Proceed to payment?").await? {
        println!("Application not submitted.");
        return Ok(());
    }
    wizard.proceed_to_payment().map_err(report)?;

    let receipt = pay_until_settled(&wizard).await?;
    render_receipt(&receipt);
    Ok(())
}

async fn pay_until_settled<G, C, S>(wizard: &ApplicationWizard<G, C, S>) -> Result<Receipt, AppError>
where
    G: RegistrationGateway + 'static,
    C: PaymentCheckout + 'static,
    S: SessionStore + 'static,
{
    let mut outcome = wizard.pay().await;
    loop {
        match outcome {
            Ok(PaymentOutcome::Submitted(receipt)) => return Ok(receipt),
            Ok(PaymentOutcome::InFlight) => {
                return Err(AppError::Input("a payment is already in progress".to_string()))
            }
            Ok(PaymentOutcome::Dismissed) => {
                println!("Payment cancelled.");
                if !confirm("Try the payment again?").await? {
                    return Err(AppError::Input("payment cancelled".to_string()));
                }
                outcome = wizard.pay().await;
            }
            Err(err) => {
                eprintln!("{}", err.user_message());
                if wizard.state().confirmed_payment.is_some() {
                    let kinds = err.attachments_to_reupload();
                    if !kinds.is_empty() {
                        reupload(wizard, &kinds).await?;
                    }
                    if !confirm("Your payment is recorded. Retry the submission?").await? {
                        return Err(err.into());
                    }
                    info!("retrying submission with the verified payment");
                    outcome = wizard.retry_submission().await;
                } else {
                    if !confirm("Try the payment again?").await? {
                        return Err(err.into());
                    }
                    outcome = wizard.pay().await;
                }
            }
        }
    }
}

/// Ask for a new PDF for each missing document and hand them to the wizard.
async fn reupload<G, C, S>(
    wizard: &ApplicationWizard<G, C, S>,
    kinds: &[AttachmentKind],
) -> Result<(), AppError>
where
    G: RegistrationGateway + 'static,
    C: PaymentCheckout + 'static,
    S: SessionStore + 'static,
{
    let mut uploads = Attachments::new();
    for kind in kinds {
        let path = prompt(&format!("Path to a new {kind} PDF (blank to skip): ")).await?;
        if path.is_empty() {
            continue;
        }
        uploads.insert(*kind, load_attachment(*kind, Path::new(&path))?);
    }
    if uploads.is_empty() {
        return Ok(());
    }
    wizard.replace_attachments(uploads).map_err(report)
}

pub(crate) fn show_receipt() -> Result<(), AppError> {
    let context = Context::load()?;
    match context.store.last_receipt()? {
        Some(receipt) => render_receipt(&receipt),
        None => println!("No application has been submitted from this device."),
    }
    Ok(())
}

pub(crate) fn show_fee(args: FeeArgs) -> Result<(), AppError> {
    let fees = FeeSchedule::default();
    let schema = ConditionalFieldSchema::default();

    let categories: Vec<&str> = match &args.category {
        Some(category) if schema.knows(category) => vec![category.as_str()],
        Some(category) => {
            return Err(AppError::Input(format!(
                "unknown registration category '{category}'"
            )))
        }
        None => schema.categories().collect(),
    };

    println!("{}", args.regtype);
    for category in categories {
        println!("  {category}: INR {}", fees.fee(args.regtype, category));
        for requirement in schema.requirements(category).unwrap_or_default() {
            println!("    - {} ({})", requirement.label, requirement.name);
        }
    }
    Ok(())
}
