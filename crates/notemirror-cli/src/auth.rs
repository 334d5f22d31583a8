//! CLI credential helpers with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use notemirror_core::Credentials;

use crate::config_profiles::{normalize_text_option, CliProfile};
use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "notemirror-cli";

/// Auth token slot for one profile.
#[derive(Clone)]
struct TokenStore {
    username: String,
}

impl TokenStore {
    fn new(profile_name: &str) -> Self {
        Self {
            username: format!("auth_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username).map_err(secure_storage_error)
    }

    #[cfg(not(test))]
    fn load(&self) -> Result<Option<String>, CliError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(normalize_text_option(Some(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(secure_storage_error(error)),
        }
    }

    #[cfg(test)]
    fn load(&self) -> Result<Option<String>, CliError> {
        let guard = Self::test_store().lock().map_err(secure_storage_error)?;
        Ok(guard.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    fn save(&self, token: &str) -> Result<(), CliError> {
        self.entry()?
            .set_password(token)
            .map_err(secure_storage_error)
    }

    #[cfg(test)]
    fn save(&self, token: &str) -> Result<(), CliError> {
        let mut guard = Self::test_store().lock().map_err(secure_storage_error)?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear(&self) -> Result<(), CliError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(secure_storage_error(error)),
        }
    }

    #[cfg(test)]
    fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store().lock().map_err(secure_storage_error)?;
        guard.remove(&self.username);
        Ok(())
    }
}

fn secure_storage_error(error: impl std::fmt::Display) -> CliError {
    CliError::Auth(format!("Secure storage failed: {error}"))
}

pub fn load_stored_token(profile_name: &str) -> Result<Option<String>, CliError> {
    TokenStore::new(profile_name).load()
}

pub fn store_token(profile_name: &str, credentials: &Credentials) -> Result<(), CliError> {
    TokenStore::new(profile_name).save(&credentials.auth_token)
}

pub fn clear_stored_token(profile_name: &str) -> Result<(), CliError> {
    TokenStore::new(profile_name).clear()
}

/// Credentials for a profile. `NOTEMIRROR_EMAIL` and `NOTEMIRROR_AUTH_TOKEN`
/// take precedence over the profile email and the keychain token.
pub fn resolve_credentials(
    profile_name: &str,
    profile: &CliProfile,
) -> Result<Credentials, CliError> {
    let email = normalize_text_option(std::env::var("NOTEMIRROR_EMAIL").ok())
        .or_else(|| profile.email());
    let token = match normalize_text_option(std::env::var("NOTEMIRROR_AUTH_TOKEN").ok()) {
        Some(token) => Some(token),
        None => load_stored_token(profile_name)?,
    };

    match (email, token) {
        (Some(email), Some(token)) => Ok(Credentials::new(email, token)?),
        _ => Err(CliError::NotSignedIn(profile_name.to_string())),
    }
}
