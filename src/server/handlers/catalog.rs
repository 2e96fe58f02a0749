//! Catalog page handlers.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::Response;

use super::super::template_structs::{
    ApplicationDetailPage, ApplicationRow, CatalogTemplatePage, TemplateCard, TemplateDetailPage,
};
use super::super::AppState;
use super::helpers::{fallback_outcome, render_page, RetryParams};
use crate::services::PageOutcome;

/// Template listing.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<RetryParams>,
    uri: Uri,
) -> Response {
    let cards = match state.catalog.list_templates().await {
        PageOutcome::Content(templates) => templates.iter().map(TemplateCard::from).collect(),
        PageOutcome::Empty => Vec::new(),
        other => {
            return fallback_outcome(&state, other, uri.path(), params, "No templates found.");
        }
    };

    render_page(
        StatusCode::OK,
        &CatalogTemplatePage {
            site_name: &state.site.name,
            title: "Templates",
            is_empty: cards.is_empty(),
            cards,
        },
    )
}

/// One template and the applications built with it.
pub async fn template_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<RetryParams>,
    uri: Uri,
) -> Response {
    let detail = match state.catalog.template_detail(&slug).await {
        PageOutcome::Content(detail) => detail,
        other => {
            return fallback_outcome(&state, other, uri.path(), params, "Template not found.");
        }
    };

    let template = &detail.template;
    render_page(
        StatusCode::OK,
        &TemplateDetailPage {
            site_name: &state.site.name,
            title: &template.name,
            card: TemplateCard::from(template),
            description: &template.description,
            has_preview: template.preview_url.is_some(),
            preview_url: template.preview_url.as_deref().unwrap_or(""),
            applications: detail.applications.iter().map(ApplicationRow::from).collect(),
        },
    )
}

/// One application of a template.
pub async fn application_detail(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Query(params): Query<RetryParams>,
    uri: Uri,
) -> Response {
    let detail = match state.catalog.application_detail(&slug, &app_id).await {
        PageOutcome::Content(detail) => detail,
        other => {
            return fallback_outcome(&state, other, uri.path(), params, "Application not found.");
        }
    };

    render_page(
        StatusCode::OK,
        &ApplicationDetailPage {
            site_name: &state.site.name,
            title: &detail.application.name,
            card: TemplateCard::from(&detail.template),
            application: ApplicationRow::from(&detail.application),
        },
    )
}
