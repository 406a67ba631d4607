mod account;
mod apply;
mod checkout;
mod cli;
mod infra;

use registration_portal::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
