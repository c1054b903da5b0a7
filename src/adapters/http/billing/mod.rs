//! HTTP adapter for payment-provider webhooks.
//!
//! Exposes the billing handlers to the providers:
//! - `POST /paddle` - Paddle subscription alerts
//! - `POST /paddle_coupon` - Paddle coupon purchases
//! - `POST /coinbase` - Coinbase Commerce charge events

pub mod handlers;
pub mod routes;

pub use handlers::{BillingAppState, CoinbaseApiError, CouponApiError, PaddleApiError};
pub use routes::{billing_router, billing_routes};
