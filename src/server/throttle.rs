//! Governor middleware for page and API traffic.
//!
//! Form posts are governed by the write services under their own budgets,
//! so only reads pass through here.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::identity::client_identity;
use super::AppState;
use crate::faults::ErrorKind;
use crate::rate_limit::{retry_after_secs, Admission, Category};

/// Which budget a request draws from, if any.
pub fn categorize(method: &Method, path: &str) -> Option<Category> {
    if path.starts_with("/static/") || path == "/health" {
        return None;
    }
    if path.starts_with("/api/") {
        return Some(Category::Api);
    }
    if method == Method::GET || method == Method::HEAD {
        return Some(Category::Public);
    }
    None
}

pub async fn throttle(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(category) = categorize(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    let identity = client_identity(
        request.headers(),
        request.extensions(),
        state.trust_proxy_headers,
    );

    match state.governor.admit(&identity, category) {
        Admission::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        Admission::Denied { retry_after } => {
            debug!(identity = %identity, category = %category, "Request throttled");
            let secs = retry_after_secs(retry_after);
            let message = ErrorKind::RateLimited.user_message();

            let mut response = if category == Category::Api {
                axum::Json(serde_json::json!({
                    "error": ErrorKind::RateLimited.as_str(),
                    "message": message,
                    "retry_after": secs,
                }))
                .into_response()
            } else {
                message.into_response()
            };
            *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize() {
        assert_eq!(categorize(&Method::GET, "/templates"), Some(Category::Public));
        assert_eq!(categorize(&Method::HEAD, "/"), Some(Category::Public));
        assert_eq!(categorize(&Method::GET, "/api/templates"), Some(Category::Api));
        assert_eq!(categorize(&Method::POST, "/contact"), None);
        assert_eq!(categorize(&Method::GET, "/static/style.css"), None);
        assert_eq!(categorize(&Method::GET, "/health"), None);
    }
}
