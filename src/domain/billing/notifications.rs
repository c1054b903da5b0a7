//! Transactional messages sent after a committed billing transition.

use super::CoinbaseSubscription;

/// A rendered email, ready for a `NotificationSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

/// Builds the messages for each notifying transition.
#[derive(Debug, Clone)]
pub struct NotificationComposer {
    product_name: String,
}

impl NotificationComposer {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
        }
    }

    pub fn subscription_cancelled(&self, end_date: Option<&str>) -> Notification {
        let until = match end_date {
            Some(date) => format!("You can keep using all premium features until {}.", date),
            None => "You can keep using all premium features until the end of the current billing period.".to_string(),
        };

        Notification {
            subject: format!("{} - your subscription is canceled", self.product_name),
            text_body: format!(
                "Your {} subscription has been canceled.\n\n{}\n\nAfter that your account goes back to the free plan.",
                self.product_name, until
            ),
            html_body: None,
        }
    }

    pub fn coinbase_started(&self, subscription: &CoinbaseSubscription) -> Notification {
        let end = subscription.end_at.date().format("%Y-%m-%d");
        Notification {
            subject: format!("Your {} account has been upgraded", self.product_name),
            text_body: format!(
                "Thank you for your payment. Your premium subscription is active until {}.",
                end
            ),
            html_body: Some(format!(
                "<p>Thank you for your payment.</p><p>Your premium subscription is active until <b>{}</b>.</p>",
                end
            )),
        }
    }

    pub fn coinbase_extended(&self, subscription: &CoinbaseSubscription) -> Notification {
        let end = subscription.end_at.date().format("%Y-%m-%d");
        Notification {
            subject: format!("Your {} account has been extended", self.product_name),
            text_body: format!(
                "Thank you for your payment. Your premium subscription has been extended until {}.",
                end
            ),
            html_body: Some(format!(
                "<p>Thank you for your payment.</p><p>Your premium subscription has been extended until <b>{}</b>.</p>",
                end
            )),
        }
    }
}
