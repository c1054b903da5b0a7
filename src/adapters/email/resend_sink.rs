//! Resend-backed notification sink.
//!
//! Delivers transactional email through the Resend HTTP API
//! (`POST {base_url}/emails` with a bearer key).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::NotificationSink;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Resend adapter.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: Secret<String>,
    from: String,
    base_url: String,
    timeout: Duration,
}

impl ResendConfig {
    /// `from` is the full header value, e.g. `Alias Relay <hi@example.com>`.
    pub fn new(api_key: Secret<String>, from: impl Into<String>) -> Self {
        Self {
            api_key,
            from: from.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

/// Sends email through Resend.
pub struct ResendNotificationSink {
    config: ResendConfig,
    client: Client,
}

impl ResendNotificationSink {
    /// # Errors
    ///
    /// `NotificationError` if the HTTP client cannot be built.
    pub fn new(config: ResendConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::NotificationError,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self { config, client })
    }

    fn emails_url(&self) -> String {
        format!("{}/emails", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl NotificationSink for ResendNotificationSink {
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> Result<(), DomainError> {
        let request = SendEmailRequest {
            from: &self.config.from,
            to: [to_email],
            subject,
            text: text_body,
            html: html_body,
        };

        let response = self
            .client
            .post(self.emails_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::NotificationError,
                    format!("Email request failed: {}", e),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, error = %error_text, "Resend send failed");
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Resend API error ({}): {}", status, error_text),
            ));
        }

        tracing::debug!(to = %to_email, subject, "Email sent");
        Ok(())
    }
}
