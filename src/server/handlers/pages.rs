//! Static presentation pages.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use super::super::template_structs::{AboutTemplate, HomeTemplate};
use super::super::AppState;
use super::helpers::{not_found, render_page};

pub async fn home(State(state): State<AppState>) -> Response {
    render_page(
        StatusCode::OK,
        &HomeTemplate {
            site_name: &state.site.name,
            title: "Home",
        },
    )
}

pub async fn about(State(state): State<AppState>) -> Response {
    render_page(
        StatusCode::OK,
        &AboutTemplate {
            site_name: &state.site.name,
            title: "About",
        },
    )
}

/// Router fallback.
pub async fn page_not_found(State(state): State<AppState>) -> Response {
    not_found(&state, "The page you are looking for does not exist.")
}
