//! Catalog models: website templates and the applications built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A website template offered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogTemplate {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub summary: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl CatalogTemplate {
    /// Price formatted for display, e.g. `GHS 1250.00`.
    pub fn price_display(&self) -> String {
        format_price(self.price_cents, &self.currency)
    }

    /// Major-unit amount suitable for prefilling the order form.
    pub fn price_input(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// A showcased application built from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateApplication {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub platform: String,
    pub description: String,
    pub demo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A template together with its active applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDetail {
    pub template: CatalogTemplate,
    pub applications: Vec<TemplateApplication>,
}

/// One application with the template it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationDetail {
    pub template: CatalogTemplate,
    pub application: TemplateApplication,
}

/// Format an amount in minor units.
pub fn format_price(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{} {}{}.{:02}", currency, sign, cents / 100, cents % 100)
}

/// Catalog file accepted by `catalog import`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub templates: Vec<TemplateImport>,
}

/// One template entry in a catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateImport {
    pub slug: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub applications: Vec<ApplicationImport>,
}

/// One application entry nested under a template.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationImport {
    pub name: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub demo_url: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_platform() -> String {
    "web".to_string()
}
