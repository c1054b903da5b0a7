//! Paddle subscription aggregate.
//!
//! One row per user. Created by the first `subscription_created` alert,
//! mutated in place by every later alert, hard-deleted on refund.
//!
//! # State Machine
//!
//! ```text
//!            created             payment / update / created
//! Absent ───────────────► Active(plan, cancelled=false) ◄──────┐
//!   ▲                         │        │                        │
//!   │ refunded                │cancel  └────────────────────────┘
//!   │                         ▼
//!   └──────────────── Active(plan, cancelled=true)
//!                         (update / created clear the flag)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Plan, SubscriptionTerms};
use crate::domain::foundation::{Timestamp, UserId};

/// Recurring subscription billed through Paddle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub subscription_id: String,
    pub plan: Plan,
    pub cancel_url: String,
    pub update_url: String,
    pub next_bill_date: NaiveDate,
    /// Receipt time of the last alert applied to this row.
    pub event_time: Timestamp,
    pub cancelled: bool,
}

impl Subscription {
    /// Creates the row for a user's first subscription.
    pub fn start(
        user_id: UserId,
        subscription_id: impl Into<String>,
        terms: SubscriptionTerms,
        now: Timestamp,
    ) -> Self {
        Self {
            user_id,
            subscription_id: subscription_id.into(),
            plan: terms.plan,
            cancel_url: terms.cancel_url,
            update_url: terms.update_url,
            next_bill_date: terms.next_bill_date,
            event_time: now,
            cancelled: false,
        }
    }

    /// Applies a `subscription_created` alert to an existing row.
    ///
    /// The user subscribed again (possibly after cancelling), so the provider
    /// id is replaced and the cancellation flag cleared.
    pub fn resubscribe(
        &mut self,
        subscription_id: impl Into<String>,
        terms: SubscriptionTerms,
        now: Timestamp,
    ) {
        self.subscription_id = subscription_id.into();
        self.apply_terms(terms, now);
    }

    /// Records a successful renewal payment.
    pub fn record_payment(&mut self, next_bill_date: NaiveDate, now: Timestamp) {
        self.next_bill_date = next_bill_date;
        self.event_time = now;
    }

    /// Marks the subscription as cancelled at period end.
    pub fn cancel(&mut self, now: Timestamp) {
        self.cancelled = true;
        self.event_time = now;
    }

    /// Applies a `subscription_updated` alert (plan change or reactivation).
    pub fn update_terms(&mut self, terms: SubscriptionTerms, now: Timestamp) {
        self.apply_terms(terms, now);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn apply_terms(&mut self, terms: SubscriptionTerms, now: Timestamp) {
        self.plan = terms.plan;
        self.cancel_url = terms.cancel_url;
        self.update_url = terms.update_url;
        self.next_bill_date = terms.next_bill_date;
        self.event_time = now;
        self.cancelled = false;
    }
}
