//! CouponIssuer - issues one-year coupons for the coupon product.
//!
//! Independent of the subscription state machine: each request creates a new
//! coupon, with no deduplication.

use std::sync::Arc;

use crate::domain::billing::{Coupon, WebhookError};
use crate::domain::foundation::RequestContext;
use crate::ports::SubscriptionLedger;

pub struct CouponIssuer {
    ledger: Arc<dyn SubscriptionLedger>,
}

impl CouponIssuer {
    pub fn new(ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { ledger }
    }

    /// Generates and persists a coupon valid for one year minus a day.
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        email: Option<&str>,
    ) -> Result<Coupon, WebhookError> {
        let coupon = Coupon::issue(ctx.now());

        let mut tx = self.ledger.begin().await?;
        tx.insert_coupon(&coupon).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %ctx.request_id,
            email = email.unwrap_or("-"),
            expires = %coupon.expires_date.date(),
            "Issued 1-year coupon"
        );
        Ok(coupon)
    }
}
