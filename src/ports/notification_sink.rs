//! Notification sink port - transactional email delivery.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Sends transactional email.
///
/// Called only after the ledger transaction has committed. Failures are
/// reported to the caller but never undo a committed transition.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// - `NotificationError` if the message could not be handed off
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> Result<(), DomainError>;
}
