//! Best-effort email forwarding for notifications.

use async_trait::async_trait;
use tracing::debug;

use crate::error::NotifyError;

/// Outbound email sink. Failures are the caller's to log; they never roll
/// back the notification record they accompany.
#[async_trait]
pub trait EmailSink: Send + Sync {
    /// Send one message.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Email sink posting to a JSON webhook relay.
pub struct WebhookEmailSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookEmailSink {
    /// Create a sink targeting the given relay URL.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl EmailSink for WebhookEmailSink {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "to": to,
            "subject": subject,
            "body": body,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::EmailFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::EmailFailed(format!(
                "relay returned HTTP {}",
                response.status()
            )));
        }

        debug!(to = %to, subject = %subject, "Forwarded notification email");
        Ok(())
    }

    fn name(&self) -> &str {
        "email-webhook"
    }
}

/// Mock email sink recording sends for tests.
#[derive(Debug, Clone, Default)]
pub struct MockEmailSink {
    /// Whether sends should fail.
    pub fail_send: bool,
    sent: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
}

impl MockEmailSink {
    /// Create a mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock sink whose sends fail.
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    /// Recorded (to, subject) pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSink for MockEmailSink {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        if self.fail_send {
            return Err(NotifyError::EmailFailed("mock send failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-email"
    }
}
