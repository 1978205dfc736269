//! OAuth2 authentication for the Gmail API
//!
//! Building a client is a single step from credentials to a ready hub: the
//! token is obtained before the hub is handed out, so nothing can call Gmail
//! with an unauthorized client.
//!
//! The `authorized_user` token the counter runs with is produced once, on a
//! machine with a browser, by [`authorize_installed_app`].

use async_trait::async_trait;
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use yup_oauth2::authorized_user::AuthorizedUserSecret;
use yup_oauth2::storage::{TokenInfo, TokenStorage};
use yup_oauth2::ApplicationSecret;

use crate::config::AuthConfig;
use crate::error::{CounterError, Result};

/// Read-only access is all the counter needs
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// An `authorized_user` token as written by Google's local auth helpers
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GmailCredentials {
    #[serde(rename = "type", default = "default_credential_type")]
    pub credential_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

// Secrets stay out of logs
impl fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("credential_type", &self.credential_type)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn default_credential_type() -> String {
    "authorized_user".to_string()
}

impl GmailCredentials {
    pub fn from_json(json: &str) -> Result<Self> {
        let credentials: Self = serde_json::from_str(json)
            .map_err(|e| CounterError::AuthError(format!("Invalid OAuth2 token: {}", e)))?;

        if credentials.credential_type != "authorized_user" {
            return Err(CounterError::AuthError(format!(
                "Unsupported credential type '{}', expected 'authorized_user'",
                credentials.credential_type
            )));
        }
        if credentials.refresh_token.is_empty() {
            return Err(CounterError::AuthError(
                "OAuth2 token has no refresh_token".to_string(),
            ));
        }

        Ok(credentials)
    }

    /// Pair an OAuth client with a refresh token issued for it
    pub fn from_application_secret(secret: &ApplicationSecret, refresh_token: String) -> Self {
        Self {
            credential_type: default_credential_type(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            refresh_token,
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CounterError::AuthError(format!("Failed to read token file {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Resolve credentials from config, preferring the inline token over the file
    pub async fn from_config(config: &AuthConfig) -> Result<Self> {
        match (&config.token, &config.token_path) {
            (Some(token), _) if !token.trim().is_empty() => Self::from_json(token),
            (_, Some(path)) => Self::from_file(path).await,
            _ => Err(CounterError::ConfigError(
                "No OAuth2 token configured".to_string(),
            )),
        }
    }
}

impl GmailCredentials {
    /// Write the token as `authorized_user` JSON, readable by [`Self::from_file`]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;

        info!("Saved OAuth2 token to {:?}", path);
        Ok(())
    }
}

impl From<GmailCredentials> for AuthorizedUserSecret {
    fn from(credentials: GmailCredentials) -> Self {
        AuthorizedUserSecret {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            refresh_token: credentials.refresh_token,
            key_type: credentials.credential_type,
        }
    }
}

/// Authorize with Google and return a Gmail hub ready for API calls
///
/// This function:
/// - builds an authorized-user authenticator from the refresh token
/// - obtains an access token for the read-only scope up front, so bad
///   credentials fail here rather than on the first API call
/// - configures an HTTP/1 client with rustls and native roots
pub async fn initialize_gmail_hub(credentials: GmailCredentials) -> Result<GmailHub> {
    let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(credentials.into())
        .build()
        .await
        .map_err(|e| CounterError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    auth.token(&[READONLY_SCOPE])
        .await
        .map_err(|e| CounterError::AuthError(format!("Failed to obtain token: {}", e)))?;

    // HTTP/1 works better with google-gmail1 than the HTTP/2 default
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| CounterError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Read an OAuth client file downloaded from the Cloud console.
///
/// Both `installed` and `web` client types are accepted.
pub async fn load_application_secret(path: &Path) -> Result<ApplicationSecret> {
    yup_oauth2::read_application_secret(path)
        .await
        .map_err(|e| CounterError::AuthError(format!("Failed to read credentials {:?}: {}", path, e)))
}

/// Keeps the refresh token handed back by the consent flow instead of a token cache
#[derive(Clone, Default)]
struct RefreshTokenCapture {
    refresh_token: Arc<Mutex<Option<String>>>,
}

impl RefreshTokenCapture {
    async fn take(&self) -> Option<String> {
        self.refresh_token.lock().await.take()
    }
}

#[async_trait]
impl TokenStorage for RefreshTokenCapture {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        if let Some(refresh_token) = token.refresh_token {
            *self.refresh_token.lock().await = Some(refresh_token);
        }
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        None
    }
}

/// Run the installed-app consent flow for the read-only scope.
///
/// Opens a local redirect listener and prints the consent URL; the user
/// approves in a browser. Returns the client from `credentials_path` paired
/// with the issued refresh token.
pub async fn authorize_installed_app(credentials_path: &Path) -> Result<GmailCredentials> {
    let secret = load_application_secret(credentials_path).await?;
    let capture = RefreshTokenCapture::default();

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret.clone(),
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .with_storage(Box::new(capture.clone()))
    .build()
    .await
    .map_err(|e| CounterError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    auth.token(&[READONLY_SCOPE])
        .await
        .map_err(|e| CounterError::AuthError(format!("Authorization failed: {}", e)))?;

    let refresh_token = capture.take().await.ok_or_else(|| {
        CounterError::AuthError("Authorization returned no refresh token".to_string())
    })?;

    Ok(GmailCredentials::from_application_secret(&secret, refresh_token))
}
