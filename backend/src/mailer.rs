use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sends one message from the brokerage's fixed sender. No retries.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Resend-compatible HTTP API (`POST {api_url}/emails`).
pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl ResendMailer {
    pub fn new(api_url: &str, api_key: &str, sender: &str) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sender: sender.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let resp = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.sender,
                "to": [email.to],
                "subject": email.subject,
                "text": email.text,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("mail to {} rejected with {}", email.to, status);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("mail sent to {}", email.to);
        Ok(())
    }
}

/// Keeps messages in memory instead of sending them. Used when no mail API
/// key is configured, and in tests.
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!("outbox: \"{}\" to {}", email.subject, email.to);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outbox_records_messages() {
        let outbox = OutboxMailer::new();
        let email = OutgoingEmail {
            to: "buyer@example.com".into(),
            subject: "Your viewing".into(),
            text: "See you Tuesday.".into(),
        };
        outbox.send(&email).await.unwrap();
        assert_eq!(outbox.sent(), vec![email]);
    }
}
