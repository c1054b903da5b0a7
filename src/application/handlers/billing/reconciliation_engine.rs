//! ReconciliationEngine - applies canonical webhook events to the ledger.
//!
//! Each event is applied inside exactly one ledger transaction. A rejected
//! transition is rolled back explicitly, and any other early return drops
//! the handle, which rolls back too, so a failed delivery never leaves a
//! partial write.
//! Notifications go out only after a successful commit.

use std::sync::Arc;

use crate::domain::billing::{
    CoinbaseEvent, CoinbaseState, CoinbaseSubscription, Coupon, Notification,
    NotificationComposer, PaddleEvent, Subscription, WebhookError, WebhookEvent,
};
use crate::domain::foundation::{RequestContext, Timestamp, UserId};
use crate::ports::{LedgerTransaction, NotificationSink, SubscriptionLedger, User, UserDirectory};

use super::CouponIssuer;

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// First subscription row created for the user.
    SubscriptionStarted {
        user_id: UserId,
        subscription_id: String,
    },
    /// Existing row replaced by a new subscription; cancellation cleared.
    Resubscribed {
        user_id: UserId,
        subscription_id: String,
    },
    /// Renewal recorded.
    PaymentRecorded { subscription_id: String },
    /// Payment for a subscription the ledger has not seen yet.
    PaymentSkipped { subscription_id: String },
    SubscriptionCancelled {
        user_id: UserId,
        subscription_id: String,
    },
    SubscriptionUpdated {
        user_id: UserId,
        subscription_id: String,
    },
    /// Row deleted after a refund.
    SubscriptionRefunded {
        user_id: UserId,
        subscription_id: String,
    },
    /// Refund for a subscription that is already gone.
    RefundSkipped { subscription_id: String },
    CoinbaseStarted { user_id: UserId, end_at: Timestamp },
    CoinbaseExtended {
        user_id: UserId,
        end_at: Timestamp,
        previous_state: CoinbaseState,
    },
    CouponIssued(Coupon),
    /// Event type with no billing effect.
    Ignored { kind: String },
}

/// Email to send once the transaction has committed.
struct PendingNotification {
    user_id: UserId,
    email: Option<String>,
    message: Notification,
}

/// Maps canonical events to ledger transitions.
pub struct ReconciliationEngine {
    ledger: Arc<dyn SubscriptionLedger>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationSink>,
    composer: NotificationComposer,
    coupons: CouponIssuer,
}

impl ReconciliationEngine {
    pub fn new(
        ledger: Arc<dyn SubscriptionLedger>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationSink>,
        composer: NotificationComposer,
    ) -> Self {
        Self {
            coupons: CouponIssuer::new(ledger.clone()),
            ledger,
            users,
            notifier,
            composer,
        }
    }

    /// Applies one event.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` for a cancel/update of an unknown subscription
    /// - `UserNotFound` when the event names a user that does not exist
    /// - `Internal` on persistence failure (nothing was written)
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        event: WebhookEvent,
    ) -> Result<Reconciliation, WebhookError> {
        match event {
            WebhookEvent::Paddle(PaddleEvent::Unhandled { alert_name }) => {
                tracing::debug!(request_id = %ctx.request_id, %alert_name, "Ignoring Paddle alert");
                Ok(Reconciliation::Ignored { kind: alert_name })
            }
            WebhookEvent::Paddle(PaddleEvent::CouponRequested { email, .. }) => {
                let coupon = self.coupons.issue(ctx, email.as_deref()).await?;
                Ok(Reconciliation::CouponIssued(coupon))
            }
            WebhookEvent::Paddle(event) => self.apply_paddle(ctx, event).await,
            WebhookEvent::Coinbase(CoinbaseEvent::NoOp { event_type }) => {
                tracing::debug!(request_id = %ctx.request_id, %event_type, "Ignoring Coinbase event");
                Ok(Reconciliation::Ignored { kind: event_type })
            }
            WebhookEvent::Coinbase(CoinbaseEvent::ChargeConfirmed { user_id, code }) => {
                self.apply_charge(ctx, user_id, &code).await
            }
        }
    }

    async fn apply_paddle(
        &self,
        ctx: &RequestContext,
        event: PaddleEvent,
    ) -> Result<Reconciliation, WebhookError> {
        if let PaddleEvent::SubscriptionCreated { user_id, .. } = &event {
            self.require_user(*user_id).await?;
        }

        let mut tx = self.ledger.begin().await?;
        let transitioned = self.transition(ctx, tx.as_mut(), event).await;
        let (outcome, pending) = match transitioned {
            Ok(applied) => applied,
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(request_id = %ctx.request_id, error = %e, "Rollback failed");
                }
                return Err(err);
            }
        };
        tx.commit().await?;

        if let Some(pending) = pending {
            self.notify(ctx, pending).await;
        }
        Ok(outcome)
    }

    /// Stages the Paddle transition. Nothing is visible until commit.
    async fn transition(
        &self,
        ctx: &RequestContext,
        tx: &mut dyn LedgerTransaction,
        event: PaddleEvent,
    ) -> Result<(Reconciliation, Option<PendingNotification>), WebhookError> {
        let now = ctx.now();

        match event {
            PaddleEvent::SubscriptionCreated {
                user_id,
                subscription_id,
                terms,
            } => match tx.get_by_user(user_id).await? {
                Some(mut sub) => {
                    tracing::info!(%user_id, %subscription_id, "Updating existing subscription");
                    sub.resubscribe(subscription_id.clone(), terms, now);
                    tx.upsert(&sub).await?;
                    Ok((
                        Reconciliation::Resubscribed {
                            user_id,
                            subscription_id,
                        },
                        None,
                    ))
                }
                None => {
                    tracing::info!(%user_id, %subscription_id, "Creating subscription");
                    let sub = Subscription::start(user_id, subscription_id.clone(), terms, now);
                    tx.upsert(&sub).await?;
                    Ok((
                        Reconciliation::SubscriptionStarted {
                            user_id,
                            subscription_id,
                        },
                        None,
                    ))
                }
            },

            PaddleEvent::PaymentSucceeded {
                subscription_id,
                next_bill_date,
            } => match tx.get_by_subscription_id(&subscription_id).await? {
                Some(mut sub) => {
                    sub.record_payment(next_bill_date, now);
                    tx.upsert(&sub).await?;
                    Ok((Reconciliation::PaymentRecorded { subscription_id }, None))
                }
                None => {
                    // Payment alerts may arrive before subscription_created.
                    tracing::info!(%subscription_id, "Payment for unknown subscription, skipping");
                    Ok((Reconciliation::PaymentSkipped { subscription_id }, None))
                }
            },

            PaddleEvent::Cancelled {
                subscription_id,
                cancellation_effective_date,
            } => {
                let mut sub = tx
                    .get_by_subscription_id(&subscription_id)
                    .await?
                    .ok_or_else(|| WebhookError::SubscriptionNotFound(subscription_id.clone()))?;

                tracing::warn!(
                    %subscription_id,
                    user_id = %sub.user_id,
                    effective = ?cancellation_effective_date,
                    next_bill_date = %sub.next_bill_date,
                    "Cancelling subscription"
                );
                sub.cancel(now);
                tx.upsert(&sub).await?;

                let pending = PendingNotification {
                    user_id: sub.user_id,
                    email: None,
                    message: self
                        .composer
                        .subscription_cancelled(cancellation_effective_date.as_deref()),
                };
                Ok((
                    Reconciliation::SubscriptionCancelled {
                        user_id: sub.user_id,
                        subscription_id,
                    },
                    Some(pending),
                ))
            }

            PaddleEvent::Updated {
                subscription_id,
                terms,
            } => {
                let mut sub = tx
                    .get_by_subscription_id(&subscription_id)
                    .await?
                    .ok_or_else(|| WebhookError::SubscriptionNotFound(subscription_id.clone()))?;

                tracing::info!(%subscription_id, user_id = %sub.user_id, plan = %terms.plan, "Updating subscription");
                sub.update_terms(terms, now);
                tx.upsert(&sub).await?;
                Ok((
                    Reconciliation::SubscriptionUpdated {
                        user_id: sub.user_id,
                        subscription_id,
                    },
                    None,
                ))
            }

            PaddleEvent::Refunded { subscription_id } => {
                match tx.get_by_subscription_id(&subscription_id).await? {
                    Some(sub) => {
                        tx.delete(&subscription_id).await?;
                        tracing::warn!(%subscription_id, user_id = %sub.user_id, "User requested a refund");
                        Ok((
                            Reconciliation::SubscriptionRefunded {
                                user_id: sub.user_id,
                                subscription_id,
                            },
                            None,
                        ))
                    }
                    None => Ok((Reconciliation::RefundSkipped { subscription_id }, None)),
                }
            }

            PaddleEvent::CouponRequested { .. } | PaddleEvent::Unhandled { .. } => {
                Err(WebhookError::Internal(format!(
                    "{} is not a subscription transition",
                    event.kind()
                )))
            }
        }
    }

    async fn apply_charge(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        code: &str,
    ) -> Result<Reconciliation, WebhookError> {
        let user = self.require_user(user_id).await?;
        let now = ctx.now();

        let mut tx = self.ledger.begin().await?;

        let (outcome, message) = match tx.get_coinbase_by_user(user_id).await? {
            None => {
                tracing::info!(%user_id, code, "Creating Coinbase subscription");
                let sub = CoinbaseSubscription::start(user_id, code, now);
                tx.upsert_coinbase(&sub).await?;
                (
                    Reconciliation::CoinbaseStarted {
                        user_id,
                        end_at: sub.end_at,
                    },
                    self.composer.coinbase_started(&sub),
                )
            }
            Some(mut sub) => {
                let applied = sub.apply_charge(code, now);
                match &applied.replaced_code {
                    Some(old) => tracing::info!(%user_id, from = %old, to = code, "Updating charge code"),
                    None => tracing::warn!(%user_id, code, "Charge code already applied, extending again"),
                }
                tx.upsert_coinbase(&sub).await?;
                (
                    Reconciliation::CoinbaseExtended {
                        user_id,
                        end_at: sub.end_at,
                        previous_state: applied.previous_state,
                    },
                    self.composer.coinbase_extended(&sub),
                )
            }
        };

        tx.commit().await?;

        self.notify(
            ctx,
            PendingNotification {
                user_id,
                email: Some(user.email),
                message,
            },
        )
        .await;

        Ok(outcome)
    }

    async fn require_user(&self, user_id: UserId) -> Result<User, WebhookError> {
        self.users.get_by_id(user_id).await?.ok_or_else(|| {
            tracing::error!(%user_id, "User not found");
            WebhookError::UserNotFound(user_id)
        })
    }

    /// Best-effort delivery; failures are logged and swallowed.
    async fn notify(&self, ctx: &RequestContext, pending: PendingNotification) {
        let email = match pending.email {
            Some(email) => email,
            None => match self.users.get_by_id(pending.user_id).await {
                Ok(Some(user)) => user.email,
                Ok(None) => {
                    tracing::warn!(request_id = %ctx.request_id, user_id = %pending.user_id, "No user to notify");
                    return;
                }
                Err(e) => {
                    tracing::warn!(request_id = %ctx.request_id, error = %e, "Failed to look up user to notify");
                    return;
                }
            },
        };

        let message = pending.message;
        if let Err(e) = self
            .notifier
            .send(
                &email,
                &message.subject,
                &message.text_body,
                message.html_body.as_deref(),
            )
            .await
        {
            tracing::warn!(
                request_id = %ctx.request_id,
                user_id = %pending.user_id,
                subject = %message.subject,
                error = %e,
                "Failed to send notification"
            );
        }
    }
}
