//! Webhook error types for payment-provider callbacks.
//!
//! Defines all error conditions that can occur while verifying, parsing and
//! reconciling a webhook, with HTTP status code mapping and retryability
//! semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, UserId};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature missing or not produced by the provider's key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body could not be decoded at all (not JSON / not a form).
    #[error("Invalid payload: {0}")]
    MalformedPayload(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Field present but unparsable.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Plan or product id outside the configured sets.
    #[error("Unknown product id: {0}")]
    UnknownProductId(String),

    /// Transition references a subscription that is not in the ledger.
    #[error("No such subscription: {0}")]
    SubscriptionNotFound(String),

    /// Event references an account that does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Persistence or other unexpected fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    ///
    /// Only internal faults are transient; every other rejection would fail
    /// identically on redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Internal(_))
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Providers retry on 5xx only, so everything that would fail the same
    /// way again is a 400.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Internal(err.to_string())
    }
}
