use registration_portal::auth::AuthError;
use registration_portal::error::AppError;
use tracing::info;

use crate::cli::{LoginArgs, ResetArgs};
use crate::infra::{prompt, Context};

fn print_field_errors(err: &AuthError) {
    if let AuthError::Validation(errors) = err {
        for (field, message) in errors.fields() {
            eprintln!("  {field}: {message}");
        }
    }
}

pub(crate) async fn login(args: LoginArgs) -> Result<(), AppError> {
    let context = Context::load()?;
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password: ").await?,
    };

    let session = context
        .auth()
        .login(&args.email, &password)
        .await
        .map_err(|err| {
            print_field_errors(&err);
            err
        })?;
    println!("Signed in as {}.", session.display_name());
    Ok(())
}

pub(crate) fn logout() -> Result<(), AppError> {
    let context = Context::load()?;
    let auth = context.auth();
    match auth.current_session() {
        Ok(session) => {
            auth.logout(session)?;
            println!("Signed out.");
            Ok(())
        }
        Err(AuthError::NotSignedIn) => {
            info!("logout requested without an active session");
            println!("Not signed in.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn forgot_password(email: &str) -> Result<(), AppError> {
    let context = Context::load()?;
    let notice = context.auth().forgot_password(email).await.map_err(|err| {
        print_field_errors(&err);
        err
    })?;
    println!("{notice}");
    Ok(())
}

pub(crate) async fn reset_password(args: ResetArgs) -> Result<(), AppError> {
    let context = Context::load()?;
    let (password, confirm) = match args.password {
        Some(password) => (password.clone(), password),
        None => (
            prompt("New password: ").await?,
            prompt("Confirm password: ").await?,
        ),
    };

    context
        .auth()
        .reset_password(&args.token, &args.email, &password, &confirm)
        .await
        .map_err(|err| {
            print_field_errors(&err);
            err
        })?;
    println!("Password reset successful. You can now sign in.");
    Ok(())
}
