//! Paddle configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::PlanCatalog;

/// Paddle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaddleConfig {
    /// Vendor public key (PEM). Literal `\n` sequences are accepted for
    /// single-line environment variables.
    pub public_key: SecretString,

    /// Plan ids billed monthly (comma-separated)
    pub monthly_product_ids: String,

    /// Plan ids billed yearly (comma-separated)
    pub yearly_product_ids: String,

    /// Current monthly plan id
    pub monthly_product_id: i64,

    /// One-off product that buys a coupon
    pub coupon_product_id: String,
}

impl PaddleConfig {
    /// Public key PEM with escaped newlines restored.
    pub fn public_key_pem(&self) -> String {
        self.public_key.expose_secret().replace("\\n", "\n")
    }

    /// Monthly plan ids as integers.
    pub fn monthly_product_ids_list(&self) -> Result<Vec<i64>, ValidationError> {
        parse_id_list(&self.monthly_product_ids, "monthly_product_ids")
    }

    /// Yearly plan ids as integers.
    pub fn yearly_product_ids_list(&self) -> Result<Vec<i64>, ValidationError> {
        parse_id_list(&self.yearly_product_ids, "yearly_product_ids")
    }

    /// Builds the plan catalog used by the event parser.
    pub fn catalog(&self) -> Result<PlanCatalog, ValidationError> {
        Ok(PlanCatalog::new(
            self.monthly_product_ids_list()?,
            self.yearly_product_ids_list()?,
            self.monthly_product_id,
            self.coupon_product_id.trim(),
        ))
    }

    /// Validate Paddle configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.public_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("PADDLE_PUBLIC_KEY"));
        }
        if !self.public_key_pem().contains("-----BEGIN") {
            return Err(ValidationError::InvalidPaddlePublicKey);
        }

        let monthly = self.monthly_product_ids_list()?;
        let yearly = self.yearly_product_ids_list()?;

        if !monthly.contains(&self.monthly_product_id) {
            return Err(ValidationError::MonthlyProductNotListed);
        }

        let coupon = self.coupon_product_id.trim();
        if coupon.is_empty() {
            return Err(ValidationError::MissingRequired("PADDLE_COUPON_PRODUCT_ID"));
        }
        let overlaps = monthly
            .iter()
            .chain(yearly.iter())
            .any(|id| id.to_string() == coupon);
        if overlaps {
            return Err(ValidationError::CouponProductOverlapsPlans);
        }

        Ok(())
    }
}

fn parse_id_list(raw: &str, field: &'static str) -> Result<Vec<i64>, ValidationError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ValidationError::InvalidProductIds(field))?;

    if ids.is_empty() {
        return Err(ValidationError::InvalidProductIds(field));
    }
    Ok(ids)
}
