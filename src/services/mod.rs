//! Request orchestration.
//!
//! [`CatalogService`] drives the read path for catalog pages; [`ContactService`]
//! and [`OrderService`] drive the two write actions. All of them funnel
//! external calls through the bounded retry executor and report terminal
//! failures to the monitoring reporter.

pub mod catalog;
pub mod contact;
pub mod order;
pub mod validation;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::SiteSettings;
use crate::faults::{classify, run_with_retry, ClassifiedError, Fault, RetryPolicy};
use crate::mailer::Mailer;
use crate::monitoring::{ReportContext, Reporter};
use crate::rate_limit::{Admission, Category, RateGovernor};

pub use catalog::{CatalogService, PageOutcome, ReadPolicy};
pub use contact::ContactService;
pub use order::OrderService;
pub use validation::{ContactInput, FieldErrors, OrderInput};

/// Why a submission was turned away before its side effect ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Structural validation failed.
    Invalid(FieldErrors),
    /// The identity exhausted its budget for this action.
    RateLimited { retry_after: Duration },
}

/// Result of a write action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<T> {
    Success(T),
    Rejected(Rejection),
    /// The side effect failed after retries.
    Failed(ClassifiedError),
}

impl<T> SubmitOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success(_))
    }
}

/// Collaborators shared by the write actions.
#[derive(Clone)]
pub struct WritePath {
    pub mailer: Arc<dyn Mailer>,
    pub governor: Arc<RateGovernor>,
    pub reporter: Arc<dyn Reporter>,
    pub retry: RetryPolicy,
    pub site: SiteSettings,
}

impl WritePath {
    fn admit(&self, identity: &str, category: Category) -> Result<(), Rejection> {
        match self.governor.admit(identity, category) {
            Admission::Allowed { .. } => Ok(()),
            Admission::Denied { retry_after } => Err(Rejection::RateLimited { retry_after }),
        }
    }

    /// Run a side effect under the write retry policy. A terminal failure is
    /// classified and reported once.
    async fn perform<T, F, Fut>(&self, context: ReportContext, op: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Fault>>,
    {
        let started = Instant::now();
        let result =
            run_with_retry(self.retry, &context.operation, self.reporter.as_ref(), op).await;

        result.map_err(|fault| {
            let classified = classify(&fault);
            self.reporter.report_exception(
                &fault,
                &context
                    .with_kind(classified.kind)
                    .with_duration(started.elapsed())
                    .tag("retryable", classified.retryable),
            );
            classified
        })
    }
}
