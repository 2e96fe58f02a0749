//! Askama template structs for the site.
//!
//! Each struct corresponds to an HTML template in the templates/ directory.
//! Every page carries `site_name` and `title` for the shared layout.

use askama::Template;

use crate::models::{CatalogTemplate, PaymentPlatform, TemplateApplication};
use crate::services::{ContactInput, FieldErrors, OrderInput};

/// Helper struct for a template card in listings.
pub struct TemplateCard {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub summary: String,
    pub price: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<&CatalogTemplate> for TemplateCard {
    fn from(template: &CatalogTemplate) -> Self {
        Self {
            slug: template.slug.clone(),
            name: template.name.clone(),
            category: template.category.clone(),
            summary: template.summary.clone(),
            price: template.price_display(),
            has_image: template.image_url.is_some(),
            image_url: template.image_url.clone().unwrap_or_default(),
        }
    }
}

/// Helper struct for an application row.
pub struct ApplicationRow {
    pub id: String,
    pub name: String,
    pub platform: String,
    pub description: String,
    pub has_demo: bool,
    pub demo_url: String,
}

impl From<&TemplateApplication> for ApplicationRow {
    fn from(app: &TemplateApplication) -> Self {
        Self {
            id: app.id.clone(),
            name: app.name.clone(),
            platform: app.platform.clone(),
            description: app.description.clone(),
            has_demo: app.demo_url.is_some(),
            demo_url: app.demo_url.clone().unwrap_or_default(),
        }
    }
}

/// Helper struct for the payment method picker.
pub struct PlatformOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl PlatformOption {
    pub fn all(selected: &str) -> Vec<Self> {
        PaymentPlatform::ALL
            .iter()
            .map(|p| Self {
                value: p.as_str(),
                label: p.label(),
                selected: p.as_str() == selected,
            })
            .collect()
    }
}

/// Landing page.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
}

/// About page.
#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
}

/// Catalog listing.
#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogTemplatePage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub cards: Vec<TemplateCard>,
    pub is_empty: bool,
}

/// One template with its applications.
#[derive(Template)]
#[template(path = "template_detail.html")]
pub struct TemplateDetailPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub card: TemplateCard,
    pub description: &'a str,
    pub has_preview: bool,
    pub preview_url: &'a str,
    pub applications: Vec<ApplicationRow>,
}

/// One application of a template.
#[derive(Template)]
#[template(path = "application_detail.html")]
pub struct ApplicationDetailPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub card: TemplateCard,
    pub application: ApplicationRow,
}

/// Contact form, blank or re-rendered with errors.
#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub input: &'a ContactInput,
    pub errors: &'a FieldErrors,
    pub has_banner: bool,
    pub banner: &'a str,
}

/// Order form, blank or re-rendered with errors.
#[derive(Template)]
#[template(path = "order.html")]
pub struct OrderPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub input: &'a OrderInput,
    pub errors: &'a FieldErrors,
    pub platforms: Vec<PlatformOption>,
    pub has_template: bool,
    pub template_name: &'a str,
    pub has_banner: bool,
    pub banner: &'a str,
}

/// Confirmation after a successful submission.
#[derive(Template)]
#[template(path = "submitted.html")]
pub struct SubmittedPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub has_receipt: bool,
    pub reference: &'a str,
    pub amount: &'a str,
    pub platform: &'a str,
}

/// Classified failure view with retry controls.
#[derive(Template)]
#[template(path = "unavailable.html")]
pub struct UnavailablePage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub kind: &'a str,
    pub auto_reload: bool,
    pub delay_secs: u64,
    pub retry_url: &'a str,
    pub manual_url: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub has_detail: bool,
    pub detail: &'a str,
}

/// Not found page.
#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage<'a> {
    pub site_name: &'a str,
    pub title: &'a str,
    pub message: &'a str,
}
