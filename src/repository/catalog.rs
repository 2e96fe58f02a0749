//! Catalog repository: templates and their showcased applications.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::diesel_models::{
    ApplicationRecord, NewApplication, NewTemplate, TemplateRecord,
};
use super::pool::{DbError, DbPool};
use super::util::{parse_datetime, within};
use crate::faults::Fault;
use crate::models::{
    ApplicationDetail, CatalogTemplate, TemplateApplication, TemplateDetail, TemplateImport,
};
use crate::schema::{template_applications, templates};
use crate::with_conn;

/// Read access to the active catalog. Every call is bounded by `timeout`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_active_templates(&self, timeout: Duration)
        -> Result<Vec<CatalogTemplate>, Fault>;

    async fn find_active_template(
        &self,
        slug: &str,
        timeout: Duration,
    ) -> Result<Option<TemplateDetail>, Fault>;

    async fn find_active_application(
        &self,
        slug: &str,
        application_id: &str,
        timeout: Duration,
    ) -> Result<Option<ApplicationDetail>, Fault>;
}

impl From<TemplateRecord> for CatalogTemplate {
    fn from(record: TemplateRecord) -> Self {
        CatalogTemplate {
            id: record.id,
            slug: record.slug,
            name: record.name,
            category: record.category,
            summary: record.summary,
            description: record.description,
            price_cents: record.price_cents,
            currency: record.currency,
            preview_url: record.preview_url,
            image_url: record.image_url,
            is_active: record.is_active != 0,
            sort_order: record.sort_order,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

impl From<ApplicationRecord> for TemplateApplication {
    fn from(record: ApplicationRecord) -> Self {
        TemplateApplication {
            id: record.id,
            template_id: record.template_id,
            name: record.name,
            platform: record.platform,
            description: record.description,
            demo_url: record.demo_url,
            is_active: record.is_active != 0,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Whether an import created a new template or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Created,
    Updated,
}

/// Diesel-backed catalog repository.
#[derive(Clone)]
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Active templates in display order.
    pub async fn list_active(&self) -> Result<Vec<CatalogTemplate>, DbError> {
        with_conn!(self.pool, conn => {
            templates::table
                .filter(templates::is_active.eq(1))
                .order((templates::sort_order.asc(), templates::name.asc()))
                .select(TemplateRecord::as_select())
                .load::<TemplateRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(CatalogTemplate::from).collect())
        })
    }

    /// Every template, active or not.
    pub async fn list_all(&self) -> Result<Vec<CatalogTemplate>, DbError> {
        with_conn!(self.pool, conn => {
            templates::table
                .order((templates::sort_order.asc(), templates::name.asc()))
                .select(TemplateRecord::as_select())
                .load::<TemplateRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(CatalogTemplate::from).collect())
        })
    }

    /// An active template with its active applications.
    pub async fn get_active_detail(&self, slug: &str) -> Result<Option<TemplateDetail>, DbError> {
        with_conn!(self.pool, conn => {
            let template = templates::table
                .filter(templates::slug.eq(slug))
                .filter(templates::is_active.eq(1))
                .select(TemplateRecord::as_select())
                .first::<TemplateRecord>(&mut conn)
                .await
                .optional()?;

            let Some(template) = template else {
                return Ok(None);
            };

            let applications = template_applications::table
                .filter(template_applications::template_id.eq(&template.id))
                .filter(template_applications::is_active.eq(1))
                .order(template_applications::name.asc())
                .select(ApplicationRecord::as_select())
                .load::<ApplicationRecord>(&mut conn)
                .await?;

            Ok(Some(TemplateDetail {
                template: template.into(),
                applications: applications.into_iter().map(TemplateApplication::from).collect(),
            }))
        })
    }

    /// One active application, only if its template is active too.
    pub async fn get_active_application(
        &self,
        slug: &str,
        application_id: &str,
    ) -> Result<Option<ApplicationDetail>, DbError> {
        with_conn!(self.pool, conn => {
            let row = template_applications::table
                .inner_join(templates::table)
                .filter(templates::slug.eq(slug))
                .filter(templates::is_active.eq(1))
                .filter(template_applications::id.eq(application_id))
                .filter(template_applications::is_active.eq(1))
                .select((TemplateRecord::as_select(), ApplicationRecord::as_select()))
                .first::<(TemplateRecord, ApplicationRecord)>(&mut conn)
                .await
                .optional()?;

            Ok(row.map(|(template, application)| ApplicationDetail {
                template: template.into(),
                application: application.into(),
            }))
        })
    }

    /// Insert or refresh a template by slug in one transaction.
    ///
    /// Applications are matched by name so their ids survive a re-import.
    /// Applications missing from the entry are hidden, not deleted.
    pub async fn import(
        &self,
        entry: &TemplateImport,
        default_currency: &str,
    ) -> Result<ImportOutcome, DbError> {
        let now = Utc::now().to_rfc3339();
        let currency = entry
            .currency
            .clone()
            .unwrap_or_else(|| default_currency.to_string());

        with_conn!(self.pool, conn => {
            conn.transaction::<_, DbError, _>(|conn| {
                let entry = entry.clone();
                Box::pin(async move {
                    let existing: Option<String> = templates::table
                        .filter(templates::slug.eq(&entry.slug))
                        .select(templates::id)
                        .first::<String>(conn)
                        .await
                        .optional()?;

                    let (template_id, outcome) = match existing {
                        Some(id) => {
                            diesel::update(templates::table.find(&id))
                                .set((
                                    templates::name.eq(&entry.name),
                                    templates::category.eq(&entry.category),
                                    templates::summary.eq(&entry.summary),
                                    templates::description.eq(&entry.description),
                                    templates::price_cents.eq(entry.price_cents),
                                    templates::currency.eq(&currency),
                                    templates::preview_url.eq(entry.preview_url.as_deref()),
                                    templates::image_url.eq(entry.image_url.as_deref()),
                                    templates::is_active.eq(1),
                                    templates::sort_order.eq(entry.sort_order),
                                    templates::updated_at.eq(&now),
                                ))
                                .execute(conn)
                                .await?;
                            (id, ImportOutcome::Updated)
                        }
                        None => {
                            let id = uuid::Uuid::new_v4().to_string();
                            diesel::insert_into(templates::table)
                                .values(NewTemplate {
                                    id: &id,
                                    slug: &entry.slug,
                                    name: &entry.name,
                                    category: &entry.category,
                                    summary: &entry.summary,
                                    description: &entry.description,
                                    price_cents: entry.price_cents,
                                    currency: &currency,
                                    preview_url: entry.preview_url.as_deref(),
                                    image_url: entry.image_url.as_deref(),
                                    is_active: 1,
                                    sort_order: entry.sort_order,
                                    created_at: &now,
                                    updated_at: &now,
                                })
                                .execute(conn)
                                .await?;
                            (id, ImportOutcome::Created)
                        }
                    };

                    let known: Vec<(String, String)> = template_applications::table
                        .filter(template_applications::template_id.eq(&template_id))
                        .select((template_applications::id, template_applications::name))
                        .load(conn)
                        .await?;

                    let mut kept = Vec::with_capacity(entry.applications.len());
                    for app in &entry.applications {
                        let found = known
                            .iter()
                            .find(|(_, name)| *name == app.name)
                            .map(|(id, _)| id.clone());

                        match found {
                            Some(app_id) => {
                                diesel::update(template_applications::table.find(&app_id))
                                    .set((
                                        template_applications::platform.eq(&app.platform),
                                        template_applications::description.eq(&app.description),
                                        template_applications::demo_url
                                            .eq(app.demo_url.as_deref()),
                                        template_applications::is_active.eq(1),
                                    ))
                                    .execute(conn)
                                    .await?;
                                kept.push(app_id);
                            }
                            None => {
                                let app_id = uuid::Uuid::new_v4().to_string();
                                diesel::insert_into(template_applications::table)
                                    .values(NewApplication {
                                        id: &app_id,
                                        template_id: &template_id,
                                        name: &app.name,
                                        platform: &app.platform,
                                        description: &app.description,
                                        demo_url: app.demo_url.as_deref(),
                                        is_active: 1,
                                        created_at: &now,
                                    })
                                    .execute(conn)
                                    .await?;
                                kept.push(app_id);
                            }
                        }
                    }

                    diesel::update(
                        template_applications::table
                            .filter(template_applications::template_id.eq(&template_id))
                            .filter(template_applications::id.ne_all(kept)),
                    )
                    .set(template_applications::is_active.eq(0))
                    .execute(conn)
                    .await?;

                    Ok(outcome)
                })
            })
            .await
        })
    }

    /// Hide a template from the site. Returns false if the slug is unknown.
    pub async fn deactivate(&self, slug: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            let rows = diesel::update(templates::table.filter(templates::slug.eq(slug)))
                .set((templates::is_active.eq(0), templates::updated_at.eq(&now)))
                .execute(&mut conn)
                .await?;
            Ok(rows > 0)
        })
    }

    /// (active, total) template counts.
    pub async fn counts(&self) -> Result<(i64, i64), DbError> {
        use diesel::dsl::count_star;

        with_conn!(self.pool, conn => {
            let total: i64 = templates::table
                .select(count_star())
                .first(&mut conn)
                .await?;
            let active: i64 = templates::table
                .filter(templates::is_active.eq(1))
                .select(count_star())
                .first(&mut conn)
                .await?;
            Ok((active, total))
        })
    }
}

#[async_trait]
impl CatalogSource for DieselCatalogRepository {
    async fn list_active_templates(
        &self,
        timeout: Duration,
    ) -> Result<Vec<CatalogTemplate>, Fault> {
        within("catalog.list", timeout, self.list_active()).await
    }

    async fn find_active_template(
        &self,
        slug: &str,
        timeout: Duration,
    ) -> Result<Option<TemplateDetail>, Fault> {
        within("catalog.template", timeout, self.get_active_detail(slug)).await
    }

    async fn find_active_application(
        &self,
        slug: &str,
        application_id: &str,
        timeout: Duration,
    ) -> Result<Option<ApplicationDetail>, Fault> {
        within(
            "catalog.application",
            timeout,
            self.get_active_application(slug, application_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationImport;
    use crate::repository::DieselDbContext;
    use tempfile::tempdir;

    async fn setup() -> (DieselCatalogRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DieselDbContext::from_sqlite_path(&dir.path().join("test.db"), 4);
        ctx.init_schema().await.unwrap();
        (ctx.catalog(), dir)
    }

    fn entry(slug: &str, sort_order: i32) -> TemplateImport {
        TemplateImport {
            slug: slug.to_string(),
            name: format!("Template {}", slug),
            category: "shop".to_string(),
            summary: "Summary".to_string(),
            description: "Description".to_string(),
            price_cents: 150_000,
            currency: None,
            preview_url: None,
            image_url: Some("https://cdn.example.com/a.png".to_string()),
            sort_order,
            applications: vec![ApplicationImport {
                name: "Bakery".to_string(),
                platform: "web".to_string(),
                description: "A bakery site".to_string(),
                demo_url: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_import_and_read_back() {
        let (repo, _dir) = setup().await;

        assert_eq!(
            repo.import(&entry("boutique", 2), "GHS").await.unwrap(),
            ImportOutcome::Created
        );
        assert_eq!(
            repo.import(&entry("agency", 1), "GHS").await.unwrap(),
            ImportOutcome::Created
        );

        let listed = repo
            .list_active_templates(Duration::from_secs(5))
            .await
            .unwrap();
        let slugs: Vec<_> = listed.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["agency", "boutique"]);
        assert_eq!(listed[0].currency, "GHS");

        let detail = repo
            .find_active_template("boutique", Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.applications.len(), 1);

        let app_id = detail.applications[0].id.clone();
        let app = repo
            .find_active_application("boutique", &app_id, Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(app.application.name, "Bakery");

        // Application id under the wrong template
        assert!(repo
            .find_active_application("agency", &app_id, Duration::from_secs(5))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reimport_refreshes_fields_and_keeps_application_ids() {
        let (repo, _dir) = setup().await;
        repo.import(&entry("boutique", 0), "GHS").await.unwrap();
        let before = repo.get_active_detail("boutique").await.unwrap().unwrap();
        let bakery_id = before.applications[0].id.clone();

        let mut updated = entry("boutique", 0);
        updated.price_cents = 99_00;
        updated.applications[0].demo_url = Some("https://demo.example.com".to_string());
        updated.applications.push(ApplicationImport {
            name: "Salon".to_string(),
            platform: "web".to_string(),
            description: String::new(),
            demo_url: None,
        });
        assert_eq!(
            repo.import(&updated, "GHS").await.unwrap(),
            ImportOutcome::Updated
        );

        let detail = repo.get_active_detail("boutique").await.unwrap().unwrap();
        assert_eq!(detail.template.id, before.template.id);
        assert_eq!(detail.template.price_cents, 99_00);
        assert_eq!(detail.applications.len(), 2);
        assert_eq!(repo.counts().await.unwrap(), (1, 1));

        let bakery = repo
            .get_active_application("boutique", &bakery_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            bakery.application.demo_url.as_deref(),
            Some("https://demo.example.com")
        );
    }

    #[tokio::test]
    async fn test_identical_reimport_keeps_links_working() {
        let (repo, _dir) = setup().await;
        repo.import(&entry("boutique", 0), "GHS").await.unwrap();
        let app_id = repo.get_active_detail("boutique").await.unwrap().unwrap().applications[0]
            .id
            .clone();

        repo.import(&entry("boutique", 0), "GHS").await.unwrap();

        assert!(repo
            .get_active_application("boutique", &app_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_reimport_hides_dropped_applications() {
        let (repo, _dir) = setup().await;
        repo.import(&entry("boutique", 0), "GHS").await.unwrap();
        let app_id = repo.get_active_detail("boutique").await.unwrap().unwrap().applications[0]
            .id
            .clone();

        let mut trimmed = entry("boutique", 0);
        trimmed.applications.clear();
        repo.import(&trimmed, "GHS").await.unwrap();

        let detail = repo.get_active_detail("boutique").await.unwrap().unwrap();
        assert!(detail.applications.is_empty());
        assert!(repo
            .get_active_application("boutique", &app_id)
            .await
            .unwrap()
            .is_none());

        // Bringing it back revives the same id.
        repo.import(&entry("boutique", 0), "GHS").await.unwrap();
        assert!(repo
            .get_active_application("boutique", &app_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_deactivated_template_is_hidden() {
        let (repo, _dir) = setup().await;
        repo.import(&entry("boutique", 0), "GHS").await.unwrap();

        assert!(repo.deactivate("boutique").await.unwrap());
        assert!(!repo.deactivate("missing").await.unwrap());

        assert!(repo.list_active().await.unwrap().is_empty());
        assert!(repo.get_active_detail("boutique").await.unwrap().is_none());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        assert_eq!(repo.counts().await.unwrap(), (0, 1));
    }
}
