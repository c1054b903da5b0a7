//! Billing domain module.
//!
//! Verifies provider webhooks, normalizes them into canonical events and
//! defines the subscription records those events drive.
//!
//! # Module Structure
//!
//! - `signature` - `SignatureVerifier` trait shared by both providers
//! - `paddle_verifier` - RSA-SHA1 verification of Paddle form alerts
//! - `coinbase_verifier` - HMAC-SHA256 verification of Coinbase bodies
//! - `event_parser` - Payload to `WebhookEvent` normalization
//! - `subscription` - Paddle subscription aggregate
//! - `coinbase_subscription` - Prepaid Coinbase subscription
//! - `coupon` - One-year coupons
//! - `notifications` - Emails sent after committed transitions

mod coinbase_subscription;
mod coinbase_verifier;
mod coupon;
mod event_parser;
mod events;
mod notifications;
mod paddle_verifier;
mod plan;
mod signature;
mod subscription;
mod webhook_errors;

pub use coinbase_subscription::{
    ChargeApplied, CoinbaseState, CoinbaseSubscription, YEARS_PER_CHARGE,
};
pub use coinbase_verifier::{sign_payload, CoinbaseSignatureVerifier, SIGNATURE_HEADER};
pub use coupon::{Coupon, COUPON_CODE_LENGTH, COUPON_COMMENT};
pub use event_parser::{CoinbaseEventParser, PaddleEventParser, CHARGE_CONFIRMED};
pub use events::{CoinbaseEvent, PaddleEvent, SubscriptionTerms, WebhookEvent};
pub use notifications::{Notification, NotificationComposer};
pub use paddle_verifier::{decode_form, php_serialize, PaddleSignatureVerifier, SIGNATURE_FIELD};
pub use plan::{Plan, PlanCatalog};
pub use signature::{FormFields, InboundWebhook, SignatureVerifier};
pub use subscription::Subscription;
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub(crate) use paddle_verifier::test_support as paddle_test_support;
