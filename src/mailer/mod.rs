//! Outgoing email delivery.
//!
//! [`HttpMailer`] talks to a transactional email HTTP API, [`LogMailer`]
//! only logs (used in development when no API key is configured), and
//! [`RecordingMailer`] captures messages for tests.

mod http;
mod recording;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::faults::Fault;

pub use http::{HttpMailer, MailerConfig};
pub use recording::RecordingMailer;

/// A plain-text email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

/// Delivers one email per call. Failures are returned as [`Fault`]s so the
/// caller can classify and retry them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), Fault>;
}

/// Mailer that writes each message to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), Fault> {
        info!(
            to = %email.to,
            reply_to = email.reply_to.as_deref().unwrap_or("-"),
            subject = %email.subject,
            "Email not sent (log mailer):\n{}",
            email.text
        );
        Ok(())
    }
}
