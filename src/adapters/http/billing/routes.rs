//! Axum router configuration for billing webhooks.

use axum::{routing::post, Router};

use super::handlers::{
    handle_coinbase_webhook, handle_paddle_coupon, handle_paddle_webhook, BillingAppState,
};

/// Create the billing webhook router.
///
/// # Routes
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /paddle` - Paddle subscription alerts
/// - `POST /paddle_coupon` - Paddle coupon purchases
/// - `POST /coinbase` - Coinbase Commerce charge events
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/paddle", post(handle_paddle_webhook))
        .route("/paddle_coupon", post(handle_paddle_coupon))
        .route("/coinbase", post(handle_coinbase_webhook))
}

/// Create the complete billing router with its state attached.
///
/// # Example
///
/// ```ignore
/// let app = axum::Router::new().merge(billing_router(state));
/// ```
pub fn billing_router(state: BillingAppState) -> Router {
    billing_routes().with_state(state)
}
