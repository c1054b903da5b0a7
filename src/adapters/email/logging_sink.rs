//! Notification sink that only logs.
//!
//! Used when no mail relay is configured (local development).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::NotificationSink;

#[derive(Debug, Default, Clone)]
pub struct LoggingNotificationSink;

impl LoggingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> Result<(), DomainError> {
        tracing::info!(
            to = %to_email,
            subject,
            text_len = text_body.len(),
            has_html = html_body.is_some(),
            "Email not sent (no relay configured)"
        );
        Ok(())
    }
}
