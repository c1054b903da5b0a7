//! One-year coupons sold as a standalone Paddle product.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Number of characters in a generated coupon code.
pub const COUPON_CODE_LENGTH: usize = 30;

/// Comment stored with every coupon issued through the purchase flow.
pub const COUPON_COMMENT: &str = "For 1-year coupon";

/// Redeemable code granting one year of premium. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub comment: String,
    pub expires_date: Timestamp,
}

impl Coupon {
    /// Issues a fresh coupon with a random code.
    pub fn issue(now: Timestamp) -> Self {
        Self::issue_with(&mut rand::rng(), now)
    }

    /// Issues a coupon drawing its code from `rng`.
    ///
    /// Expires one calendar year minus one day after `now`.
    pub fn issue_with<R: Rng + ?Sized>(rng: &mut R, now: Timestamp) -> Self {
        Self {
            code: Alphanumeric.sample_string(rng, COUPON_CODE_LENGTH),
            comment: COUPON_COMMENT.to_string(),
            expires_date: now.add_years(1).add_days(-1),
        }
    }

    /// HTML fragment returned to the buyer by the fulfillment callback.
    pub fn receipt_html(&self) -> String {
        format!(
            "Your 1-year coupon is <b>{}</b> <br> It's valid until <b>{}</b>",
            self.code,
            self.expires_date.date().format("%Y-%m-%d")
        )
    }
}
