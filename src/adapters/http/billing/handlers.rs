//! HTTP handlers for payment-provider webhooks.
//!
//! These handlers connect axum routes to the application layer command handlers.
//! Each endpoint answers with the literal texts the providers expect.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::application::handlers::billing::{
    HandleCoinbaseWebhookCommand, HandleCoinbaseWebhookHandler, HandlePaddleWebhookCommand,
    HandlePaddleWebhookHandler, IssueCouponCommand, IssueCouponHandler, ReconciliationEngine,
};
use crate::domain::billing::{
    CoinbaseSignatureVerifier, PaddleEventParser, PaddleSignatureVerifier, WebhookError,
    SIGNATURE_HEADER,
};
use crate::domain::foundation::{Provider, RequestContext};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Application state for billing webhook handlers.
///
/// Holds the shared verifiers, parser and engine; command handlers are built
/// per request from these.
#[derive(Clone)]
pub struct BillingAppState {
    pub paddle_verifier: Arc<PaddleSignatureVerifier>,
    pub paddle_parser: Arc<PaddleEventParser>,
    pub coinbase_verifier: Arc<CoinbaseSignatureVerifier>,
    pub engine: Arc<ReconciliationEngine>,
}

impl BillingAppState {
    pub fn new(
        paddle_verifier: Arc<PaddleSignatureVerifier>,
        paddle_parser: Arc<PaddleEventParser>,
        coinbase_verifier: Arc<CoinbaseSignatureVerifier>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            paddle_verifier,
            paddle_parser,
            coinbase_verifier,
            engine,
        }
    }

    pub fn paddle_webhook_handler(&self) -> HandlePaddleWebhookHandler {
        HandlePaddleWebhookHandler::new(
            self.paddle_verifier.clone(),
            self.paddle_parser.clone(),
            self.engine.clone(),
        )
    }

    pub fn coupon_handler(&self) -> IssueCouponHandler {
        IssueCouponHandler::new(
            self.paddle_verifier.clone(),
            self.paddle_parser.clone(),
            self.engine.clone(),
        )
    }

    pub fn coinbase_webhook_handler(&self) -> HandleCoinbaseWebhookHandler {
        HandleCoinbaseWebhookHandler::new(self.coinbase_verifier.clone(), self.engine.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /paddle - Handle Paddle subscription alerts
pub async fn handle_paddle_webhook(
    State(state): State<BillingAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, PaddleApiError> {
    let ctx = RequestContext::new(Provider::Paddle);
    let cmd = HandlePaddleWebhookCommand {
        body: body.to_vec(),
    };

    state.paddle_webhook_handler().handle(&ctx, cmd).await?;

    Ok((StatusCode::OK, "OK"))
}

/// POST /paddle_coupon - Issue a one-year coupon for a Paddle purchase
pub async fn handle_paddle_coupon(
    State(state): State<BillingAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, CouponApiError> {
    let ctx = RequestContext::new(Provider::Paddle);
    let cmd = IssueCouponCommand {
        body: body.to_vec(),
    };

    let coupon = state.coupon_handler().handle(&ctx, cmd).await?;

    Ok(Html(coupon.receipt_html()))
}

/// POST /coinbase - Handle Coinbase Commerce events
pub async fn handle_coinbase_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, CoinbaseApiError> {
    let ctx = RequestContext::new(Provider::Coinbase);
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleCoinbaseWebhookCommand {
        body: body.to_vec(),
        signature,
    };

    state.coinbase_webhook_handler().handle(&ctx, cmd).await?;

    Ok((StatusCode::OK, "success"))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

const INTERNAL_ERROR_TEXT: &str = "Internal error";

/// API error for `/paddle`.
#[derive(Debug)]
pub struct PaddleApiError(WebhookError);

impl From<WebhookError> for PaddleApiError {
    fn from(err: WebhookError) -> Self {
        PaddleApiError(err)
    }
}

impl IntoResponse for PaddleApiError {
    fn into_response(self) -> Response {
        let text = match &self.0 {
            WebhookError::Internal(_) => INTERNAL_ERROR_TEXT,
            WebhookError::UnknownProductId(_) | WebhookError::SubscriptionNotFound(_) => {
                "No such subscription"
            }
            WebhookError::UserNotFound(_) => "No such user",
            _ => "KO",
        };
        (self.0.status_code(), text).into_response()
    }
}

/// API error for `/paddle_coupon`.
#[derive(Debug)]
pub struct CouponApiError(WebhookError);

impl From<WebhookError> for CouponApiError {
    fn from(err: WebhookError) -> Self {
        CouponApiError(err)
    }
}

impl IntoResponse for CouponApiError {
    fn into_response(self) -> Response {
        let text = match &self.0 {
            WebhookError::Internal(_) => INTERNAL_ERROR_TEXT,
            _ => "KO",
        };
        (self.0.status_code(), text).into_response()
    }
}

/// API error for `/coinbase`.
#[derive(Debug)]
pub struct CoinbaseApiError(WebhookError);

impl From<WebhookError> for CoinbaseApiError {
    fn from(err: WebhookError) -> Self {
        CoinbaseApiError(err)
    }
}

/// Texts the Coinbase Commerce SDKs answer with on verification failures.
const COINBASE_SIGNATURE_MISMATCH: &str =
    "No signatures found matching the expected signature for payload";
const COINBASE_INVALID_PAYLOAD: &str = "Invalid payload provided";

impl IntoResponse for CoinbaseApiError {
    fn into_response(self) -> Response {
        let text = match &self.0 {
            WebhookError::Internal(_) => INTERNAL_ERROR_TEXT.to_string(),
            WebhookError::UserNotFound(_) => "error".to_string(),
            WebhookError::InvalidSignature => COINBASE_SIGNATURE_MISMATCH.to_string(),
            WebhookError::MalformedPayload(_) => COINBASE_INVALID_PAYLOAD.to_string(),
            other => other.to_string(),
        };
        (self.0.status_code(), text).into_response()
    }
}
