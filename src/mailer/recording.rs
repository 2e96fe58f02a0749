use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{Mailer, OutgoingEmail};
use crate::faults::Fault;

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<OutgoingEmail>,
    attempts: usize,
    failures: VecDeque<Fault>,
}

/// Mailer that keeps sent messages in memory.
///
/// Queued failures are returned one per call before any send succeeds, which
/// lets tests script "fail once, then succeed". Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next call.
    pub fn fail_next(&self, fault: Fault) -> &Self {
        self.lock().failures.push_back(fault);
        self
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.lock().sent.clone()
    }

    /// Total calls to [`Mailer::send`], successful or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), Fault> {
        let mut inner = self.lock();
        inner.attempts += 1;
        if let Some(fault) = inner.failures.pop_front() {
            return Err(fault);
        }
        inner.sent.push(email.clone());
        Ok(())
    }
}
