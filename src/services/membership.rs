//! Membership payments
//!
//! Dues are collected through an external checkout gateway. Initiating a
//! payment stores a fresh verification key on the user and sends them to
//! the gateway's checkout page; the gateway redirects back to
//! `/membership/verify/{key}`, which transitions the user to paid.

use crate::config::PaymentConfig;
use crate::db::repositories::UserRepository;
use crate::models::User;
use anyhow::Context;
use chrono::Utc;
use data_encoding::{BASE64URL, HEXLOWER};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha224};
use std::sync::Arc;

/// Error types for membership payment operations
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// The gateway rejected or failed the checkout call
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Transport-level failure talking to the gateway
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A checkout created at the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    /// Gateway-assigned checkout id
    pub checkout_id: i64,
    /// URL the member must visit to complete payment
    pub checkout_uri: String,
}

/// HTTP client for the payment gateway
pub struct PaymentGateway {
    http: reqwest::Client,
    config: PaymentConfig,
}

impl PaymentGateway {
    /// Create a new gateway client
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create a checkout for one year of membership dues.
    pub async fn create_checkout(&self, redirect_uri: &str) -> Result<Checkout, MembershipError> {
        let url = format!(
            "{}/checkout/create",
            self.config.gateway_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({
                "account_id": self.config.account_id,
                "amount": self.config.amount,
                "short_description": self.config.description,
                "mode": "regular",
                "type": "SERVICE",
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MembershipError::Gateway(format!("{}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

/// Membership payment service
pub struct MembershipService {
    user_repo: Arc<dyn UserRepository>,
    gateway: PaymentGateway,
    public_url: String,
}

impl MembershipService {
    /// Create a new membership service
    pub fn new(user_repo: Arc<dyn UserRepository>, gateway: PaymentGateway, public_url: &str) -> Self {
        Self {
            user_repo,
            gateway,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Generate a payment verification key for a user: SHA-224 over a
    /// urlsafe-base64 random seed concatenated with the email and name,
    /// hex-encoded.
    pub fn generate_verification_key(user: &User) -> Result<String, MembershipError> {
        let mut random = [0u8; 30];
        getrandom::getrandom(&mut random)
            .map_err(|e| anyhow::anyhow!("Failed to gather randomness: {}", e))?;
        let seed = BASE64URL.encode(&random);

        let mut hasher = Sha224::new();
        hasher.update(seed.as_bytes());
        hasher.update(user.email.as_bytes());
        hasher.update(user.name.as_bytes());

        Ok(HEXLOWER.encode(&hasher.finalize()))
    }

    /// Start a checkout for a user's membership dues.
    ///
    /// The verification key is stored before the gateway call so the
    /// redirect can be resolved even if the checkout id write races the
    /// member returning from the gateway.
    pub async fn begin_checkout(&self, user: &User) -> Result<Checkout, MembershipError> {
        let key = Self::generate_verification_key(user)?;
        self.user_repo
            .set_payment_verification(user.id, &key)
            .await
            .context("Failed to store verification key")?;

        let redirect_uri = format!("{}/membership/verify/{}", self.public_url, key);
        let checkout = self.gateway.create_checkout(&redirect_uri).await?;

        self.user_repo
            .set_checkout_id(user.id, checkout.checkout_id)
            .await
            .context("Failed to store checkout id")?;

        Ok(checkout)
    }

    /// Handle the gateway redirect: mark the key's user as paid.
    ///
    /// An unknown key returns `None` without any state change.
    pub async fn verify(&self, key: &str) -> Result<Option<User>, MembershipError> {
        let user = match self
            .user_repo
            .get_by_verification_key(key)
            .await
            .context("Failed to look up verification key")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        self.user_repo
            .mark_paid(user.id, Utc::now())
            .await
            .context("Failed to mark user paid")?;

        Ok(self
            .user_repo
            .get_by_id(user.id)
            .await
            .context("Failed to reload user")?)
    }
}
