use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use registration_portal::error::AppError;
use registration_portal::workflows::registration::RegistrationType;

use crate::account;
use crate::apply;

#[derive(Parser, Debug)]
#[command(
    name = "portal",
    about = "Apply for council registration and pay the fee from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session for later commands
    Login(LoginArgs),
    /// Sign out and forget the stored session and receipt
    Logout,
    /// Request a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using the token from a reset link
    ResetPassword(ResetArgs),
    /// Fill, review and pay for a new registration application
    Apply(ApplyArgs),
    /// Show the receipt of the last submitted application
    Receipt,
    /// Show the fee and the category-specific fields
    Fee(FeeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct LoginArgs {
    #[arg(long)]
    pub(crate) email: String,
    /// Prompted for when omitted
    #[arg(long)]
    pub(crate) password: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ResetArgs {
    /// Token from the reset link
    #[arg(long)]
    pub(crate) token: String,
    #[arg(long)]
    pub(crate) email: String,
    /// Prompted for when omitted
    #[arg(long)]
    pub(crate) password: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// JSON file with `basic` and `conditional` sections, using the portal's field names
    #[arg(long)]
    pub(crate) form: PathBuf,
    /// PAN card PDF
    #[arg(long)]
    pub(crate) pan: Option<PathBuf>,
    /// Aadhaar card PDF
    #[arg(long)]
    pub(crate) aadhaar: Option<PathBuf>,
    /// Signature PDF
    #[arg(long)]
    pub(crate) signature: Option<PathBuf>,
    /// Skip the review confirmation
    #[arg(long, short = 'y')]
    pub(crate) yes: bool,
}

#[derive(Args, Debug)]
pub(crate) struct FeeArgs {
    #[arg(long, value_parser = parse_regtype, default_value = "regular")]
    pub(crate) regtype: RegistrationType,
    /// Registration category; lists every category when omitted
    #[arg(long)]
    pub(crate) category: Option<String>,
}

pub(crate) fn parse_regtype(value: &str) -> Result<RegistrationType, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "regular" | "post" => Ok(RegistrationType::RegularByPost),
        "tatkal" | "hand" => Ok(RegistrationType::TatkalByHand),
        other => Err(format!(
            "unknown registration type '{other}', expected 'regular' or 'tatkal'"
        )),
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Login(args) => account::login(args).await,
        Command::Logout => account::logout(),
        Command::ForgotPassword { email } => account::forgot_password(&email).await,
        Command::ResetPassword(args) => account::reset_password(args).await,
        Command::Apply(args) => apply::run(args).await,
        Command::Receipt => apply::show_receipt(),
        Command::Fee(args) => apply::show_fee(args),
    }
}
