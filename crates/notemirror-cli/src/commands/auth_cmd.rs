use std::env;

use notemirror_core::remote::login;

use crate::auth::{clear_stored_token, resolve_credentials, store_token};
use crate::cli::AuthCommands;
use crate::commands::common::Context;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, context: &Context) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let email = normalize_text_option(email)
                .or_else(|| normalize_text_option(env::var("NOTEMIRROR_EMAIL").ok()))
                .or_else(|| context.profile.email())
                .ok_or_else(|| {
                    CliError::Auth(format!(
                        "No email for profile '{}'. Pass --email or run `notemirror config init --email <email>`.",
                        context.profile_name
                    ))
                })?;
            let password = password
                .filter(|value| !value.is_empty())
                .or_else(|| env::var("NOTEMIRROR_PASSWORD").ok().filter(|value| !value.is_empty()))
                .ok_or_else(|| {
                    CliError::Auth("Pass --password or set NOTEMIRROR_PASSWORD".to_string())
                })?;

            let credentials = login(&context.client_config()?, &email, &password).await?;
            store_token(&context.profile_name, &credentials)?;
            remember_email(&context.profile_name, &credentials.email)?;

            println!(
                "Signed in profile '{}' as {}",
                context.profile_name, credentials.email
            );
            Ok(())
        }
        AuthCommands::Status => {
            match resolve_credentials(&context.profile_name, &context.profile) {
                Ok(credentials) => println!(
                    "Profile '{}' is signed in as {}",
                    context.profile_name, credentials.email
                ),
                Err(CliError::NotSignedIn(_)) => {
                    println!("Profile '{}' is not signed in.", context.profile_name);
                }
                Err(error) => return Err(error),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            clear_stored_token(&context.profile_name)?;
            println!("Signed out profile '{}'", context.profile_name);
            Ok(())
        }
    }
}

/// Store the signed-in email on the profile when it has none yet.
fn remember_email(profile_name: &str, email: &str) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile = config.profile_mut_or_default(profile_name);
    if profile.email().is_some() {
        return Ok(());
    }
    profile.email = Some(email.to_string());
    config.save().map_err(CliError::Config)?;
    Ok(())
}
