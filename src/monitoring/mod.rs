//! Error and performance reporting.
//!
//! Reporters are fire-and-forget: they never block the request and never
//! fail. [`TracingReporter`] only logs; [`WebhookReporter`] also ships each
//! event to an HTTP collector from a detached task.

mod memory;
mod webhook;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::faults::{ErrorKind, Fault};

pub use memory::{MemoryReporter, ReportedEvent};
pub use webhook::WebhookReporter;

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Context attached to every report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportContext {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ReportContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn tag(mut self, key: &str, value: impl ToString) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

/// Sink for exceptions and diagnostic messages.
pub trait Reporter: Send + Sync {
    fn report_exception(&self, fault: &Fault, context: &ReportContext);

    fn report_message(&self, message: &str, level: Level, context: &ReportContext);
}

/// Reporter that writes everything to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report_exception(&self, fault: &Fault, context: &ReportContext) {
        error!(
            operation = %context.operation,
            kind = context.kind.map(|k| k.as_str()).unwrap_or("unclassified"),
            code = fault.code.as_deref().unwrap_or("-"),
            duration_ms = context.duration_ms,
            tags = ?context.tags,
            "{}",
            fault
        );
    }

    fn report_message(&self, message: &str, level: Level, context: &ReportContext) {
        match level {
            Level::Info => info!(
                operation = %context.operation,
                duration_ms = context.duration_ms,
                tags = ?context.tags,
                "{}",
                message
            ),
            Level::Warning => warn!(
                operation = %context.operation,
                duration_ms = context.duration_ms,
                tags = ?context.tags,
                "{}",
                message
            ),
            Level::Error => error!(
                operation = %context.operation,
                duration_ms = context.duration_ms,
                tags = ?context.tags,
                "{}",
                message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = ReportContext::new("catalog.list")
            .with_kind(ErrorKind::Timeout)
            .with_duration(Duration::from_millis(2750))
            .tag("page", "catalog")
            .tag("attempt", 2);

        assert_eq!(ctx.operation, "catalog.list");
        assert_eq!(ctx.kind, Some(ErrorKind::Timeout));
        assert_eq!(ctx.duration_ms, Some(2750));
        assert_eq!(ctx.tags.get("attempt").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_context_serializes_compactly() {
        let json = serde_json::to_value(ReportContext::new("contact.submit")).unwrap();
        assert_eq!(json, serde_json::json!({ "operation": "contact.submit" }));
    }

    #[test]
    fn test_tracing_reporter_never_panics() {
        let reporter = TracingReporter;
        let ctx = ReportContext::new("test");
        reporter.report_exception(&Fault::new("boom"), &ctx);
        reporter.report_message("slow", Level::Warning, &ctx);
    }
}
