//! Outbound mail channel.
//!
//! The engine never talks SMTP itself: rendered mails are handed to a
//! [`Mailer`], in production a REST endpoint that accepts the message as a
//! JSON document and queues it for delivery.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

/// A fully rendered mail on its way out.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingMail {
    pub from_email: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Posts mails to a REST mail endpoint.
pub struct RestMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl RestMailer {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("signalen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Mailer for RestMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("accept", "text/plain")
            .json(mail)
            .send()
            .await?;
        response.error_for_status()?;
        tracing::debug!(
            subject = %mail.subject,
            recipients = mail.to.len(),
            "mail handed to rest endpoint"
        );
        Ok(())
    }
}

/// Logs mails instead of sending them. Used when no endpoint is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(
            to = ?mail.to,
            subject = %mail.subject,
            "mail endpoint not configured; logging instead of sending"
        );
        Ok(())
    }
}
