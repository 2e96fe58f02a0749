//! Router configuration for the web server.

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::throttle::throttle;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Presentation pages
        .route("/", get(handlers::home))
        .route("/about", get(handlers::about))
        // Catalog
        .route("/templates", get(handlers::list_templates))
        .route("/templates/:slug", get(handlers::template_detail))
        .route(
            "/templates/:slug/applications/:app_id",
            get(handlers::application_detail),
        )
        // Forms
        .route(
            "/contact",
            get(handlers::contact_page).post(handlers::contact_submit),
        )
        .route(
            "/order",
            get(handlers::order_page).post(handlers::order_submit),
        )
        // JSON API
        .route("/api/templates", get(handlers::api_templates))
        .route("/health", get(handlers::health))
        // Static assets
        .route("/static/style.css", get(handlers::serve_css))
        .fallback(handlers::page_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), throttle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
