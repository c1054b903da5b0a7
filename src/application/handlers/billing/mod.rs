//! Billing handlers.
//!
//! ## Commands
//! - Processing Paddle subscription alerts
//! - Issuing coupons for Paddle coupon purchases
//! - Processing Coinbase Commerce charge events
//!
//! `ReconciliationEngine` holds the state machine shared by all three.

mod coupon_issuer;
mod handle_coinbase_webhook;
mod handle_paddle_webhook;
mod issue_coupon;
mod reconciliation_engine;

pub use coupon_issuer::CouponIssuer;
pub use handle_coinbase_webhook::{HandleCoinbaseWebhookCommand, HandleCoinbaseWebhookHandler};
pub use handle_paddle_webhook::{HandlePaddleWebhookCommand, HandlePaddleWebhookHandler};
pub use issue_coupon::{IssueCouponCommand, IssueCouponHandler};
pub use reconciliation_engine::{Reconciliation, ReconciliationEngine};

use crate::domain::billing::WebhookError;
use crate::domain::foundation::RequestContext;

/// Logs a failed delivery with its raw payload and hands the error back.
///
/// Internal faults and forged signatures are errors; everything else is a
/// warning.
fn log_failure(ctx: &RequestContext, stage: &str, err: WebhookError, body: &[u8]) -> WebhookError {
    let payload = String::from_utf8_lossy(body);
    if err.is_retryable() {
        tracing::error!(
            request_id = %ctx.request_id,
            provider = %ctx.provider,
            stage,
            error = %err,
            %payload,
            "Webhook processing failed"
        );
    } else if matches!(err, WebhookError::InvalidSignature) {
        tracing::error!(
            request_id = %ctx.request_id,
            provider = %ctx.provider,
            %payload,
            "Request not coming from provider"
        );
    } else {
        tracing::warn!(
            request_id = %ctx.request_id,
            provider = %ctx.provider,
            stage,
            error = %err,
            %payload,
            "Webhook rejected"
        );
    }
    err
}
