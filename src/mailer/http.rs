//! Transactional email over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::{Mailer, OutgoingEmail};
use crate::faults::Fault;

/// Connection settings for the email API.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Posts each message as JSON with a bearer key.
pub struct HttpMailer {
    config: MailerConfig,
    client: Client,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Map a non-success response onto a fault the classifier understands.
    fn status_fault(status: StatusCode, body: &str) -> Fault {
        let body = body.trim();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Fault::with_code(
                "EAUTH",
                format!("mail api rejected credentials ({})", status),
            ),
            StatusCode::TOO_MANY_REQUESTS => {
                Fault::with_code("429", format!("mail api rate limit: {}", body))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Fault::with_code(
                "EINVAL",
                format!("mail provider rejected message ({}): {}", status, body),
            ),
            _ => Fault::new(format!("email service returned {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), Fault> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(Fault::new(
                "email service not configured: missing environment variable MAIL_API_KEY",
            ));
        };

        let request = SendRequest {
            from: &self.config.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            reply_to: email.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Fault::from(e).context("email service"))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %email.to, %status, "Email accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::status_fault(status, &body))
    }
}
