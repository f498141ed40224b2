//! Keyring-based credential storage for the catalog API

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

use crate::catalog::{AppCredentials, CatalogClient};

const KEYRING_SERVICE: &str = "tunegrab";

/// Manages Spotify app credential storage
pub struct AuthManager;

impl AuthManager {
    /// Load app credentials from the keyring, or prompt for new ones
    ///
    /// New credentials are verified against the token endpoint before being
    /// stored.
    pub async fn authenticate(
        client_id: Option<String>,
        client_secret: Option<String>,
        force: bool,
    ) -> Result<AppCredentials> {
        if !force {
            if let Ok(credentials) = Self::load() {
                info!("Found existing credentials in keyring");
                return Ok(credentials);
            }
        } else {
            debug!("Force flag set, ignoring stored credentials");
        }

        if client_id.is_none() || client_secret.is_none() {
            info!(
                "Create a Spotify app and paste its values below: \
                 https://developer.spotify.com/dashboard"
            );
        }

        let client_id = match client_id {
            Some(value) => value,
            None => Input::new()
                .with_prompt("Client ID")
                .interact_text()
                .context("Failed to read client id")?,
        };

        let client_secret = match client_secret {
            Some(value) => value,
            None => Password::new()
                .with_prompt("Client secret")
                .interact()
                .context("Failed to read client secret")?,
        };

        let credentials = AppCredentials {
            client_id,
            client_secret,
        };

        Self::verify(&credentials).await?;

        Self::store(&credentials)?;
        info!("Credentials stored in keyring");

        Ok(credentials)
    }

    /// Load credentials from keyring
    pub fn load() -> Result<AppCredentials> {
        let client_id = Self::entry("client_id")?
            .get_password()
            .context("No client id in keyring")?;

        let client_secret = Self::entry("client_secret")?
            .get_password()
            .context("No client secret in keyring")?;

        Ok(AppCredentials {
            client_id,
            client_secret,
        })
    }

    /// Store credentials in keyring
    pub fn store(credentials: &AppCredentials) -> Result<()> {
        Self::entry("client_id")?
            .set_password(&credentials.client_id)
            .context("Failed to store client id in keyring")?;

        Self::entry("client_secret")?
            .set_password(&credentials.client_secret)
            .context("Failed to store client secret in keyring")?;

        debug!("Credentials stored in keyring");
        Ok(())
    }

    /// Clear stored credentials
    pub fn clear() -> Result<()> {
        let _ = Self::entry("client_id")?.delete_credential();
        let _ = Self::entry("client_secret")?.delete_credential();
        info!("Credentials cleared from keyring");
        Ok(())
    }

    /// Verify credentials by fetching a client-credentials token
    async fn verify(credentials: &AppCredentials) -> Result<()> {
        debug!("Verifying app credentials");

        let client = CatalogClient::new(credentials.clone())?;
        client
            .authenticate()
            .await
            .context("Failed to verify credentials")?;

        info!("Credentials verified successfully");
        Ok(())
    }

    fn entry(key: &str) -> Result<Entry> {
        let entry_key = format!("spotify:{key}");
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}
