//! Reporter that forwards events to an HTTP collector.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{Level, ReportContext, Reporter, TracingReporter};
use crate::faults::Fault;

#[derive(Debug, Serialize)]
struct WebhookEvent<'a> {
    environment: &'a str,
    level: Level,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    context: &'a ReportContext,
    timestamp: String,
}

/// Logs locally and posts a JSON event to `url` without waiting for it.
#[derive(Clone)]
pub struct WebhookReporter {
    client: reqwest::Client,
    url: String,
    environment: String,
    local: TracingReporter,
}

impl WebhookReporter {
    pub fn new(url: &str, environment: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            environment: environment.to_string(),
            local: TracingReporter,
        })
    }

    fn ship(&self, level: Level, message: &str, code: Option<&str>, context: &ReportContext) {
        let event = WebhookEvent {
            environment: &self.environment,
            level,
            message,
            code,
            context,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let body = match serde_json::to_vec(&event) {
            Ok(body) => body,
            Err(e) => {
                debug!("Dropping monitoring event: {}", e);
                return;
            }
        };

        // Outside a runtime (CLI teardown) the event is only logged.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        handle.spawn(async move {
            if let Err(e) = request.send().await {
                debug!("Monitoring webhook unreachable: {}", e);
            }
        });
    }
}

impl Reporter for WebhookReporter {
    fn report_exception(&self, fault: &Fault, context: &ReportContext) {
        self.local.report_exception(fault, context);
        self.ship(Level::Error, &fault.message, fault.code.as_deref(), context);
    }

    fn report_message(&self, message: &str, level: Level, context: &ReportContext) {
        self.local.report_message(message, level, context);
        self.ship(level, message, None, context);
    }
}
