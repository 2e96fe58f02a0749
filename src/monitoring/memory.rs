//! In-memory reporter for inspecting reports in tests and dev tooling.

use std::sync::{Arc, Mutex, PoisonError};

use super::{Level, ReportContext, Reporter};
use crate::faults::Fault;

/// A captured report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportedEvent {
    Exception {
        fault: Fault,
        context: ReportContext,
    },
    Message {
        message: String,
        level: Level,
        context: ReportContext,
    },
}

impl ReportedEvent {
    pub fn context(&self) -> &ReportContext {
        match self {
            ReportedEvent::Exception { context, .. } => context,
            ReportedEvent::Message { context, .. } => context,
        }
    }
}

/// Reporter that keeps every event in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    events: Arc<Mutex<Vec<ReportedEvent>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn exceptions(&self) -> Vec<(Fault, ReportContext)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportedEvent::Exception { fault, context } => Some((fault, context)),
                _ => None,
            })
            .collect()
    }

    /// Messages whose text starts with `prefix`.
    pub fn messages_starting_with(&self, prefix: &str) -> Vec<(String, ReportContext)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportedEvent::Message {
                    message, context, ..
                } if message.starts_with(prefix) => Some((message, context)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Reporter for MemoryReporter {
    fn report_exception(&self, fault: &Fault, context: &ReportContext) {
        self.push(ReportedEvent::Exception {
            fault: fault.clone(),
            context: context.clone(),
        });
    }

    fn report_message(&self, message: &str, level: Level, context: &ReportContext) {
        self.push(ReportedEvent::Message {
            message: message.to_string(),
            level,
            context: context.clone(),
        });
    }
}
