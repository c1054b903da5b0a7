//! Coinbase Commerce configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Coinbase Commerce configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseConfig {
    /// Shared secret for `X-CC-Webhook-Signature`
    pub webhook_secret: SecretString,
}

impl CoinbaseConfig {
    /// Validate Coinbase configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("COINBASE_WEBHOOK_SECRET"));
        }
        Ok(())
    }
}
