//! OAuth login flow
//!
//! The identity provider is an opaque collaborator configured by URL: the
//! client builds the authorization redirect, exchanges the callback code for
//! an access token, and fetches the user info document carrying the email
//! and its verification flag.

use crate::config::OauthConfig;
use serde::Deserialize;

/// Error types for the OAuth flow
#[derive(Debug, thiserror::Error)]
pub enum OauthError {
    /// The provider rejected the code exchange (HTTP 403 at our boundary)
    #[error("Code exchange rejected: {0}")]
    ExchangeRejected(String),

    /// The provider response was missing expected fields
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure talking to the provider
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// User identity as reported by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct OauthUser {
    /// Email address
    pub email: String,
    /// Whether the provider has verified the address
    #[serde(alias = "email_verified", default)]
    pub verified_email: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// OAuth client for the configured identity provider
pub struct OauthClient {
    http: reqwest::Client,
    config: OauthConfig,
    redirect_uri: String,
}

impl OauthClient {
    /// Create a new OAuth client.
    ///
    /// The callback lands on `{public_url}/oauth2callback`.
    pub fn new(config: OauthConfig, public_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            redirect_uri: format!("{}/oauth2callback", public_url.trim_end_matches('/')),
        }
    }

    /// Build the provider authorization URL.
    ///
    /// `state` round-trips through the provider and carries the requested
    /// post-login path.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope=openid%20email&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, OauthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OauthError::ExchangeRejected(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        if let Some(error) = token.error {
            return Err(OauthError::ExchangeRejected(error));
        }

        token
            .access_token
            .ok_or_else(|| OauthError::MalformedResponse("missing access_token".to_string()))
    }

    /// Fetch the authenticated user's identity from the provider.
    pub async fn fetch_user(&self, access_token: &str) -> Result<OauthUser, OauthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OauthError::MalformedResponse(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}
