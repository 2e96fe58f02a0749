//! Read Path Tests
//!
//! Loads catalog pages from a real SQLite catalog through a source that can be
//! told to fail, and checks what each page would render.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use storefront::config::{Environment, ReadPathSettings};
use storefront::faults::{ErrorKind, Fault, RetryPolicy};
use storefront::models::{ApplicationDetail, CatalogFile, CatalogTemplate, TemplateDetail};
use storefront::monitoring::MemoryReporter;
use storefront::repository::{CatalogSource, DieselCatalogRepository, DieselDbContext};
use storefront::services::{CatalogService, PageOutcome, ReadPolicy};

/// Real catalog with a queue of faults served before each call succeeds.
struct FlakyCatalog {
    inner: DieselCatalogRepository,
    failures: Mutex<VecDeque<Fault>>,
    calls: Mutex<usize>,
}

impl FlakyCatalog {
    fn next_failure(&self) -> Option<Fault> {
        *self.calls.lock().unwrap() += 1;
        self.failures.lock().unwrap().pop_front()
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CatalogSource for FlakyCatalog {
    async fn list_active_templates(
        &self,
        timeout: Duration,
    ) -> Result<Vec<CatalogTemplate>, Fault> {
        if let Some(fault) = self.next_failure() {
            return Err(fault);
        }
        self.inner.list_active_templates(timeout).await
    }

    async fn find_active_template(
        &self,
        slug: &str,
        timeout: Duration,
    ) -> Result<Option<TemplateDetail>, Fault> {
        if let Some(fault) = self.next_failure() {
            return Err(fault);
        }
        self.inner.find_active_template(slug, timeout).await
    }

    async fn find_active_application(
        &self,
        slug: &str,
        application_id: &str,
        timeout: Duration,
    ) -> Result<Option<ApplicationDetail>, Fault> {
        if let Some(fault) = self.next_failure() {
            return Err(fault);
        }
        self.inner
            .find_active_application(slug, application_id, timeout)
            .await
    }
}

struct Catalog {
    _dir: TempDir,
    ctx: DieselDbContext,
    source: Arc<FlakyCatalog>,
    reporter: MemoryReporter,
}

impl Catalog {
    fn service(&self, environment: Environment) -> CatalogService {
        let policy = ReadPolicy {
            retry: RetryPolicy::new(2, Duration::from_millis(10)),
            read: ReadPathSettings::default(),
        };
        CatalogService::new(
            self.source.clone(),
            Arc::new(self.reporter.clone()),
            policy,
            environment,
        )
    }

    fn fail_with(&self, faults: Vec<Fault>) {
        self.source.failures.lock().unwrap().extend(faults);
    }
}

async fn catalog() -> Catalog {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DieselDbContext::from_sqlite_path(&dir.path().join("catalog.db"), 4);
    ctx.init_schema().await.unwrap();

    let file: CatalogFile = serde_json::from_value(serde_json::json!({
        "templates": [
            {
                "slug": "bakery-pro",
                "name": "Bakery Pro",
                "category": "food",
                "price_cents": 150000,
                "sort_order": 1,
                "applications": [
                    { "name": "Order tracker", "platform": "web" },
                    { "name": "Loyalty app", "platform": "mobile" }
                ]
            },
            {
                "slug": "boutique",
                "name": "Boutique",
                "price_cents": 90000,
                "sort_order": 2
            }
        ]
    }))
    .unwrap();

    let repo = ctx.catalog();
    for entry in &file.templates {
        repo.import(entry, "GHS").await.unwrap();
    }

    let source = Arc::new(FlakyCatalog {
        inner: ctx.catalog(),
        failures: Mutex::new(VecDeque::new()),
        calls: Mutex::new(0),
    });

    Catalog {
        _dir: dir,
        ctx,
        source,
        reporter: MemoryReporter::new(),
    }
}

#[tokio::test]
async fn test_catalog_lists_active_templates_in_order() {
    let catalog = catalog().await;
    let service = catalog.service(Environment::Production);

    match service.list_templates().await {
        PageOutcome::Content(templates) => {
            let slugs: Vec<_> = templates.iter().map(|t| t.slug.as_str()).collect();
            assert_eq!(slugs, vec!["bakery-pro", "boutique"]);
            assert_eq!(templates[0].currency, "GHS");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(catalog.reporter.events().is_empty());
}

#[tokio::test]
async fn test_deactivated_catalog_renders_empty_state() {
    let catalog = catalog().await;
    let repo = catalog.ctx.catalog();
    assert!(repo.deactivate("bakery-pro").await.unwrap());
    assert!(repo.deactivate("boutique").await.unwrap());

    let service = catalog.service(Environment::Production);
    assert_eq!(service.list_templates().await, PageOutcome::Empty);
    assert_eq!(
        service.template_detail("boutique").await,
        PageOutcome::NotFound
    );
}

#[tokio::test]
async fn test_transient_failure_recovers_on_second_attempt() {
    let catalog = catalog().await;
    catalog.fail_with(vec![Fault::with_code("ECONNRESET", "connection reset by peer")]);
    let service = catalog.service(Environment::Production);

    match service.template_detail("bakery-pro").await {
        PageOutcome::Content(detail) => {
            assert_eq!(detail.template.name, "Bakery Pro");
            assert_eq!(detail.applications.len(), 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(catalog.source.calls(), 2);

    let retries = catalog.reporter.messages_starting_with("retrying");
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].1.operation, "catalog.template");
    assert!(catalog.reporter.exceptions().is_empty());
}

#[tokio::test]
async fn test_outage_renders_unavailable_in_production() {
    let catalog = catalog().await;
    catalog.fail_with(vec![
        Fault::with_code("SQLITE_BUSY", "database is locked"),
        Fault::with_code("SQLITE_BUSY", "database is locked"),
    ]);
    let service = catalog.service(Environment::Production);

    match service.list_templates().await {
        PageOutcome::Unavailable(error) => {
            assert_eq!(error.kind, ErrorKind::ConnectionError);
            assert!(error.retryable);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let exceptions = catalog.reporter.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].1.operation, "catalog.list");
    assert_eq!(exceptions[0].1.tags.get("page").map(String::as_str), Some("catalog"));
}

#[tokio::test]
async fn test_outage_shows_detail_in_development() {
    let catalog = catalog().await;
    catalog.fail_with(vec![
        Fault::with_code("SQLITE_BUSY", "database is locked"),
        Fault::with_code("SQLITE_BUSY", "database is locked"),
    ]);
    let service = catalog.service(Environment::Development);

    match service.list_templates().await {
        PageOutcome::Detailed { error, detail } => {
            assert_eq!(error.kind, ErrorKind::ConnectionError);
            assert!(detail.contains("SQLITE_BUSY"));
            assert!(detail.contains("database is locked"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_permission_failure_is_not_retried() {
    let catalog = catalog().await;
    catalog.fail_with(vec![Fault::with_code("42501", "permission denied for table templates")]);
    let service = catalog.service(Environment::Production);

    assert_eq!(
        service.template_detail("bakery-pro").await,
        PageOutcome::NotFound
    );
    assert_eq!(catalog.source.calls(), 1);

    let exceptions = catalog.reporter.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].1.kind, Some(ErrorKind::PermissionError));
}

#[tokio::test]
async fn test_application_page_resolves_nested_application() {
    let catalog = catalog().await;
    let service = catalog.service(Environment::Production);

    let detail = match service.template_detail("bakery-pro").await {
        PageOutcome::Content(detail) => detail,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let application = &detail.applications[0];

    match service.application_detail("bakery-pro", &application.id).await {
        PageOutcome::Content(found) => {
            assert_eq!(found.application.id, application.id);
            assert_eq!(found.template.slug, "bakery-pro");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // The application belongs to a different template.
    assert_eq!(
        service.application_detail("boutique", &application.id).await,
        PageOutcome::NotFound
    );
}

#[tokio::test]
async fn test_malformed_identifiers_never_reach_the_database() {
    let catalog = catalog().await;
    let service = catalog.service(Environment::Production);

    assert_eq!(
        service.template_detail("../etc/passwd").await,
        PageOutcome::NotFound
    );
    assert_eq!(
        service.application_detail("bakery-pro", "not-a-uuid").await,
        PageOutcome::NotFound
    );
    assert_eq!(catalog.source.calls(), 0);
}
