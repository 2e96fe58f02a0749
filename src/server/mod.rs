//! Web server for the storefront.
//!
//! Serves the presentation pages, the template catalog, the contact and
//! order forms, and a small JSON API. Page and API reads pass through the
//! rate governor middleware; form posts are governed by the write services.

mod assets;
mod handlers;
mod identity;
mod routes;
mod template_structs;
mod throttle;

pub use identity::{client_identity, ClientIdentity};
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Settings, SiteSettings};
use crate::mailer::{HttpMailer, LogMailer, Mailer};
use crate::monitoring::{Reporter, TracingReporter, WebhookReporter};
use crate::rate_limit::{spawn_sweeper, RateGovernor};
use crate::repository::{CatalogSource, OrderStore};
use crate::services::{CatalogService, ContactService, OrderService, WritePath};

/// External collaborators the services are built on.
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogSource>,
    pub orders: Arc<dyn OrderStore>,
    pub mailer: Arc<dyn Mailer>,
    pub reporter: Arc<dyn Reporter>,
    pub governor: Arc<RateGovernor>,
}

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub contact: Arc<ContactService>,
    pub orders: Arc<OrderService>,
    pub governor: Arc<RateGovernor>,
    pub site: Arc<SiteSettings>,
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// Build the production state: database repositories, the configured
    /// mailer and reporter, and a fresh governor.
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let ctx = settings.create_db_context()?;

        let collaborators = Collaborators {
            catalog: Arc::new(ctx.catalog()),
            orders: Arc::new(ctx.orders()),
            mailer: build_mailer(settings)?,
            reporter: build_reporter(settings)?,
            governor: Arc::new(RateGovernor::new(settings.rate_limit.clone())),
        };
        Ok(Self::assemble(settings, collaborators))
    }

    /// Wire services from explicit collaborators.
    pub fn assemble(settings: &Settings, deps: Collaborators) -> Self {
        let write = WritePath {
            mailer: deps.mailer,
            governor: deps.governor.clone(),
            reporter: deps.reporter.clone(),
            retry: settings.write_retry,
            site: settings.site.clone(),
        };

        Self {
            catalog: Arc::new(CatalogService::new(
                deps.catalog,
                deps.reporter,
                settings.read_policy(),
                settings.environment,
            )),
            contact: Arc::new(ContactService::new(write.clone())),
            orders: Arc::new(OrderService::new(deps.orders, write)),
            governor: deps.governor,
            site: Arc::new(settings.site.clone()),
            trust_proxy_headers: settings.trust_proxy_headers,
        }
    }
}

/// Development without an API key logs mail instead of sending it. In
/// production the HTTP mailer is always used, so a missing key surfaces as a
/// configuration failure on the first send.
fn build_mailer(settings: &Settings) -> anyhow::Result<Arc<dyn Mailer>> {
    if settings.mail.api_key.is_none() && settings.environment.is_development() {
        warn!("MAIL_API_KEY not set, emails will only be logged");
        return Ok(Arc::new(LogMailer));
    }
    Ok(Arc::new(HttpMailer::new(settings.mailer_config())?))
}

fn build_reporter(settings: &Settings) -> anyhow::Result<Arc<dyn Reporter>> {
    match settings.monitoring_webhook.as_deref() {
        Some(url) => Ok(Arc::new(WebhookReporter::new(
            url,
            settings.environment.as_str(),
        )?)),
        None => Ok(Arc::new(TracingReporter)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Start the web server and run until Ctrl+C.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let sweeper = spawn_sweeper(state.governor.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Starting server at http://{}", listener.local_addr()?);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::config::Environment;
    use crate::mailer::RecordingMailer;
    use crate::models::{ApplicationImport, TemplateImport};
    use crate::monitoring::MemoryReporter;
    use crate::rate_limit::CategoryLimit;
    use crate::repository::DieselDbContext;

    struct TestApp {
        app: axum::Router,
        ctx: DieselDbContext,
        mailer: RecordingMailer,
        _dir: tempfile::TempDir,
    }

    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.environment = Environment::Production;
        settings.rate_limit.allow_list = HashSet::new();
        settings.write_retry = crate::faults::RetryPolicy::new(2, Duration::from_millis(10));
        settings
    }

    async fn setup_test_app_with(settings: Settings) -> TestApp {
        let dir = tempdir().unwrap();
        let ctx = DieselDbContext::from_sqlite_path(&dir.path().join("test.db"), 4);
        ctx.init_schema().await.unwrap();

        let mailer = RecordingMailer::new();
        let deps = Collaborators {
            catalog: Arc::new(ctx.catalog()),
            orders: Arc::new(ctx.orders()),
            mailer: Arc::new(mailer.clone()),
            reporter: Arc::new(MemoryReporter::new()),
            governor: Arc::new(RateGovernor::new(settings.rate_limit.clone())),
        };
        let state = AppState::assemble(&settings, deps);

        TestApp {
            app: create_router(state),
            ctx,
            mailer,
            _dir: dir,
        }
    }

    async fn setup_test_app() -> TestApp {
        setup_test_app_with(test_settings()).await
    }

    async fn seed(ctx: &DieselDbContext) {
        let entry = TemplateImport {
            slug: "bakery-pro".to_string(),
            name: "Bakery Pro".to_string(),
            category: "food".to_string(),
            summary: "Storefront for bakeries".to_string(),
            description: "Menu, ordering, and delivery zones.".to_string(),
            price_cents: 150_000,
            currency: None,
            preview_url: Some("https://preview.example.com/bakery".to_string()),
            image_url: None,
            sort_order: 1,
            applications: vec![ApplicationImport {
                name: "Sweet Crumbs".to_string(),
                platform: "web".to_string(),
                description: "A bakery in Osu.".to_string(),
                demo_url: None,
            }],
        };
        ctx.catalog().import(&entry, "GHS").await.unwrap();
    }

    async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(app: &axum::Router, uri: &str, body: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_presentation_pages() {
        let t = setup_test_app().await;

        for uri in ["/", "/about", "/contact", "/order"] {
            let response = get(&t.app, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            let html = body_text(response).await;
            assert!(html.contains("<!DOCTYPE html>"));
        }
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let t = setup_test_app().await;

        let response = get(&t.app, "/templates").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No templates are available"));
    }

    #[tokio::test]
    async fn test_catalog_pages() {
        let t = setup_test_app().await;
        seed(&t.ctx).await;

        let html = body_text(get(&t.app, "/templates").await).await;
        assert!(html.contains("Bakery Pro"));
        assert!(html.contains("GHS 1500.00"));

        let response = get(&t.app, "/templates/bakery-pro").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Sweet Crumbs"));
        assert!(html.contains("/order?template=bakery-pro"));

        let detail = t
            .ctx
            .catalog()
            .get_active_detail("bakery-pro")
            .await
            .unwrap()
            .unwrap();
        let app_id = &detail.applications[0].id;
        let response = get(&t.app, &format!("/templates/bakery-pro/applications/{}", app_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("A bakery in Osu."));
    }

    #[tokio::test]
    async fn test_mangled_retry_param_still_renders() {
        let t = setup_test_app().await;
        seed(&t.ctx).await;

        for uri in [
            "/templates?retry=abc",
            "/templates?retry=99999999999",
            "/templates/bakery-pro?retry=%20",
        ] {
            let response = get(&t.app, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            assert!(body_text(response).await.contains("Bakery Pro"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_pages_are_not_found() {
        let t = setup_test_app().await;
        seed(&t.ctx).await;

        for uri in [
            "/templates/missing",
            "/templates/Not_A_Slug",
            "/templates/bakery-pro/applications/not-a-uuid",
            "/nowhere",
        ] {
            let response = get(&t.app, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_order_page_prefills_from_catalog() {
        let t = setup_test_app().await;
        seed(&t.ctx).await;

        let html = body_text(get(&t.app, "/order?template=bakery-pro").await).await;
        assert!(html.contains("You are ordering <strong>Bakery Pro</strong>"));
        assert!(html.contains(r#"value="1500.00""#));
    }

    #[tokio::test]
    async fn test_api_templates() {
        let t = setup_test_app().await;

        let json: serde_json::Value =
            serde_json::from_str(&body_text(get(&t.app, "/api/templates").await).await).unwrap();
        assert_eq!(json, serde_json::json!([]));

        seed(&t.ctx).await;
        let json: serde_json::Value =
            serde_json::from_str(&body_text(get(&t.app, "/api/templates").await).await).unwrap();
        assert_eq!(json[0]["slug"], "bakery-pro");
        assert_eq!(json[0]["price_cents"], 150_000);
    }

    #[tokio::test]
    async fn test_health_and_css() {
        let t = setup_test_app().await;

        assert_eq!(get(&t.app, "/health").await.status(), StatusCode::OK);

        let response = get(&t.app, "/static/style.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap_or(""));
        assert!(content_type.unwrap_or("").contains("css"));
    }

    #[tokio::test]
    async fn test_contact_validation_rejects_locally() {
        let t = setup_test_app().await;

        let response = post_form(
            &t.app,
            "/contact",
            "name=Ama&email=ama%40example.com&message=Too+short",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Message is too short"));
        assert_eq!(t.mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_contact_success() {
        let t = setup_test_app().await;

        let response = post_form(
            &t.app,
            "/contact",
            "name=Ama+Mensah&email=ama%40example.com&message=Please+send+me+a+quote.",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Message sent"));
        assert_eq!(t.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_cash_order_is_stored() {
        let t = setup_test_app().await;

        let response = post_form(
            &t.app,
            "/order",
            "template=bakery-pro&customer_name=Kofi+Boateng&email=kofi%40example.com\
             &phone=0244+123+456&amount=1500&payment_platform=cash",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Reference"));

        let orders = t.ctx.orders().recent(10).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount_cents, 150_000);
        assert_eq!(orders[0].client_ip, "unknown");
    }

    #[tokio::test]
    async fn test_order_rate_limit_sets_retry_after() {
        let t = setup_test_app().await;
        let body = "template=bakery-pro&customer_name=Kofi+Boateng&email=kofi%40example.com\
                    &phone=0244123456&amount=20&payment_platform=cash";

        assert_eq!(post_form(&t.app, "/order", body).await.status(), StatusCode::OK);
        assert_eq!(post_form(&t.app, "/order", body).await.status(), StatusCode::OK);

        let response = post_form(&t.app, "/order", body).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(t.ctx.orders().recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_api_budget_throttles() {
        let mut settings = test_settings();
        settings.rate_limit.api = CategoryLimit::new(1, 60);
        let t = setup_test_app_with(settings).await;

        assert_eq!(get(&t.app, "/api/templates").await.status(), StatusCode::OK);

        let response = get(&t.app, "/api/templates").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        // Health and static assets are never governed.
        assert_eq!(get(&t.app, "/health").await.status(), StatusCode::OK);
        assert_eq!(get(&t.app, "/static/style.css").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_identity_when_trusted() {
        let mut settings = test_settings();
        settings.trust_proxy_headers = true;
        settings.rate_limit.public = CategoryLimit::new(1, 60);
        let t = setup_test_app_with(settings).await;

        let from = |ip: &str| {
            Request::builder()
                .uri("/about")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        let first = t.app.clone().oneshot(from("192.0.2.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = t.app.clone().oneshot(from("192.0.2.1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = t.app.clone().oneshot(from("192.0.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }
}
