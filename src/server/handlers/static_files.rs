//! Static file serving handlers.

use axum::{http::header, response::IntoResponse};

use super::super::assets;

/// Serve CSS.
pub async fn serve_css() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/css"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        assets::CSS,
    )
}
