//! Read path for catalog pages.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::validation::is_template_identifier;
use crate::config::{Environment, ReadPathSettings};
use crate::faults::{classify, run_with_retry, ClassifiedError, Fault, RetryPolicy};
use crate::models::{ApplicationDetail, CatalogTemplate, TemplateDetail};
use crate::monitoring::{Level, ReportContext, Reporter};
use crate::repository::CatalogSource;

/// Retry, deadline, and slow-load thresholds for page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub retry: RetryPolicy,
    pub read: ReadPathSettings,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(2, Duration::from_millis(500)),
            read: ReadPathSettings::default(),
        }
    }
}

/// What a page should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<T> {
    Content(T),
    /// The query worked but there is nothing to show.
    Empty,
    NotFound,
    /// A transient failure; the page offers a retry.
    Unavailable(ClassifiedError),
    /// Development only: the classified failure plus the raw fault text.
    Detailed { error: ClassifiedError, detail: String },
}

struct Failure {
    classified: ClassifiedError,
    fault: Fault,
}

/// Loads catalog data for pages and the JSON API.
pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
    reporter: Arc<dyn Reporter>,
    policy: ReadPolicy,
    environment: Environment,
}

impl CatalogService {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        reporter: Arc<dyn Reporter>,
        policy: ReadPolicy,
        environment: Environment,
    ) -> Self {
        Self {
            source,
            reporter,
            policy,
            environment,
        }
    }

    /// Active templates for the catalog page.
    pub async fn list_templates(&self) -> PageOutcome<Vec<CatalogTemplate>> {
        let timeout = self.policy.read.timeout;
        let context = ReportContext::new("catalog.list").tag("page", "catalog");

        match self
            .fetch(context, self.policy.read.slow_list, || {
                self.source.list_active_templates(timeout)
            })
            .await
        {
            Ok(templates) if templates.is_empty() => PageOutcome::Empty,
            Ok(templates) => PageOutcome::Content(templates),
            Err(failure) => self.failure_outcome(failure),
        }
    }

    /// One template with its applications.
    pub async fn template_detail(&self, slug: &str) -> PageOutcome<TemplateDetail> {
        if !is_template_identifier(slug) {
            return PageOutcome::NotFound;
        }

        let timeout = self.policy.read.timeout;
        let context = ReportContext::new("catalog.template")
            .tag("page", "template")
            .tag("slug", slug);

        match self
            .fetch(context, self.policy.read.slow_template, || {
                self.source.find_active_template(slug, timeout)
            })
            .await
        {
            Ok(Some(detail)) => PageOutcome::Content(detail),
            Ok(None) => PageOutcome::NotFound,
            Err(failure) => self.failure_outcome(failure),
        }
    }

    /// One application under a template.
    pub async fn application_detail(
        &self,
        slug: &str,
        application_id: &str,
    ) -> PageOutcome<ApplicationDetail> {
        if !is_template_identifier(slug) || uuid::Uuid::parse_str(application_id).is_err() {
            return PageOutcome::NotFound;
        }

        let timeout = self.policy.read.timeout;
        let context = ReportContext::new("catalog.application")
            .tag("page", "application")
            .tag("slug", slug)
            .tag("application_id", application_id);

        match self
            .fetch(context, self.policy.read.slow_application, || {
                self.source
                    .find_active_application(slug, application_id, timeout)
            })
            .await
        {
            Ok(Some(detail)) => PageOutcome::Content(detail),
            Ok(None) => PageOutcome::NotFound,
            Err(failure) => self.failure_outcome(failure),
        }
    }

    async fn fetch<T, F, Fut>(
        &self,
        context: ReportContext,
        slow_after: Duration,
        op: F,
    ) -> Result<T, Failure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Fault>>,
    {
        let started = Instant::now();
        let result = run_with_retry(
            self.policy.retry,
            &context.operation,
            self.reporter.as_ref(),
            op,
        )
        .await;
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                if elapsed > slow_after {
                    self.reporter.report_message(
                        &format!("slow page load: {}", context.operation),
                        Level::Warning,
                        &context
                            .with_duration(elapsed)
                            .tag("threshold_ms", slow_after.as_millis()),
                    );
                }
                Ok(value)
            }
            Err(fault) => {
                let classified = classify(&fault);
                self.reporter.report_exception(
                    &fault,
                    &context
                        .with_kind(classified.kind)
                        .with_duration(elapsed)
                        .tag("retryable", classified.retryable),
                );
                Err(Failure { classified, fault })
            }
        }
    }

    fn failure_outcome<T>(&self, failure: Failure) -> PageOutcome<T> {
        let Failure { classified, fault } = failure;

        if self.environment.is_development() {
            let detail = match fault.code {
                Some(ref code) => format!("[{}] {}", code, fault.message),
                None => fault.message.clone(),
            };
            return PageOutcome::Detailed {
                error: classified,
                detail,
            };
        }

        if classified.retryable {
            PageOutcome::Unavailable(classified)
        } else {
            PageOutcome::NotFound
        }
    }
}
