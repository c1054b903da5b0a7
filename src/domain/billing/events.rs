//! Canonical webhook events.
//!
//! Raw provider payloads are decoded at the boundary into these closed
//! variants; nothing downstream ever looks at a form field or JSON key again.
//! Events are never persisted.

use chrono::NaiveDate;

use super::Plan;
use crate::domain::foundation::UserId;

/// Plan and management links carried by create/update alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTerms {
    pub plan: Plan,
    pub cancel_url: String,
    pub update_url: String,
    pub next_bill_date: NaiveDate,
}

/// A normalized Paddle alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaddleEvent {
    /// `subscription_created`
    SubscriptionCreated {
        user_id: UserId,
        subscription_id: String,
        terms: SubscriptionTerms,
    },
    /// `subscription_payment_succeeded`
    PaymentSucceeded {
        subscription_id: String,
        next_bill_date: NaiveDate,
    },
    /// `subscription_cancelled`
    ///
    /// The effective date is kept as sent; it only appears in the email.
    Cancelled {
        subscription_id: String,
        cancellation_effective_date: Option<String>,
    },
    /// `subscription_updated`
    Updated {
        subscription_id: String,
        terms: SubscriptionTerms,
    },
    /// `payment_refunded`
    Refunded { subscription_id: String },
    /// One-off purchase of the coupon product (fulfillment callback).
    CouponRequested {
        product_id: String,
        email: Option<String>,
    },
    /// Any other alert; acknowledged without effect.
    Unhandled { alert_name: String },
}

impl PaddleEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PaddleEvent::SubscriptionCreated { .. } => "subscription_created",
            PaddleEvent::PaymentSucceeded { .. } => "subscription_payment_succeeded",
            PaddleEvent::Cancelled { .. } => "subscription_cancelled",
            PaddleEvent::Updated { .. } => "subscription_updated",
            PaddleEvent::Refunded { .. } => "payment_refunded",
            PaddleEvent::CouponRequested { .. } => "coupon_requested",
            PaddleEvent::Unhandled { .. } => "unhandled",
        }
    }
}

/// A normalized Coinbase Commerce event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinbaseEvent {
    /// `charge:confirmed`
    ChargeConfirmed { user_id: UserId, code: String },
    /// Any other event type; acknowledged without effect.
    NoOp { event_type: String },
}

impl CoinbaseEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CoinbaseEvent::ChargeConfirmed { .. } => "charge:confirmed",
            CoinbaseEvent::NoOp { .. } => "noop",
        }
    }
}

/// Any canonical event, tagged by provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Paddle(PaddleEvent),
    Coinbase(CoinbaseEvent),
}

impl WebhookEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Paddle(event) => event.kind(),
            WebhookEvent::Coinbase(event) => event.kind(),
        }
    }
}

impl From<PaddleEvent> for WebhookEvent {
    fn from(event: PaddleEvent) -> Self {
        WebhookEvent::Paddle(event)
    }
}

impl From<CoinbaseEvent> for WebhookEvent {
    fn from(event: CoinbaseEvent) -> Self {
        WebhookEvent::Coinbase(event)
    }
}
