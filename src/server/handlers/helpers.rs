//! Helper types and rendering functions for handlers.

use std::time::Duration;

use askama::Template;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

use super::super::template_structs::{NotFoundPage, UnavailablePage};
use super::super::AppState;
use crate::faults::ClassifiedError;
use crate::rate_limit::retry_after_secs;
use crate::services::PageOutcome;

/// Automatic reloads a failed page attempts before only the manual link is left.
pub const MAX_AUTO_RETRIES: u32 = 3;

/// `?retry=n` carried by automatic reloads.
///
/// Kept as text so a mangled value still renders the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryParams {
    pub retry: Option<String>,
}

impl RetryParams {
    /// Automatic reloads already made. Anything unparsable counts as none.
    pub fn previous(&self) -> u32 {
        self.retry
            .as_deref()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Browser-side retry state for a failed page.
///
/// Independent of the server-side retry executor: the server has already
/// retried by the time this view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiRetry {
    /// Number of the next automatic reload (1-based).
    pub attempt: u32,
    pub auto_reload: bool,
    pub delay_secs: u64,
    pub retry_url: String,
    pub manual_url: String,
}

impl UiRetry {
    /// Next step after `previous` automatic reloads of `path`.
    pub fn after(path: &str, previous: u32, retryable: bool) -> Self {
        let attempt = previous.saturating_add(1);
        Self {
            attempt,
            auto_reload: retryable && previous < MAX_AUTO_RETRIES,
            // 1s, 2s, 4s
            delay_secs: 1u64 << previous.min(MAX_AUTO_RETRIES - 1),
            retry_url: format!("{}?retry={}", path, attempt),
            manual_url: path.to_string(),
        }
    }
}

/// Render an askama template with a status code.
pub fn render_page<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Template error: {}", e)),
            )
                .into_response()
        }
    }
}

/// Attach a `Retry-After` header.
pub fn with_retry_after(mut response: Response, retry_after: Duration) -> Response {
    response.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after_secs(retry_after)),
    );
    response
}

pub fn not_found(state: &AppState, message: &str) -> Response {
    render_page(
        StatusCode::NOT_FOUND,
        &NotFoundPage {
            site_name: &state.site.name,
            title: "Not Found",
            message,
        },
    )
}

/// Classified failure view. `detail` is only passed in development.
pub fn failure_page(
    state: &AppState,
    path: &str,
    params: RetryParams,
    error: &ClassifiedError,
    detail: Option<&str>,
) -> Response {
    let retry = UiRetry::after(path, params.previous(), error.retryable);
    render_page(
        error.status_code(),
        &UnavailablePage {
            site_name: &state.site.name,
            title: "Something went wrong",
            message: &error.user_message,
            kind: error.kind.as_str(),
            auto_reload: retry.auto_reload,
            delay_secs: retry.delay_secs,
            retry_url: &retry.retry_url,
            manual_url: &retry.manual_url,
            attempt: retry.attempt,
            max_attempts: MAX_AUTO_RETRIES,
            has_detail: detail.is_some(),
            detail: detail.unwrap_or(""),
        },
    )
}

/// Response for any outcome the page itself does not render.
pub fn fallback_outcome<T>(
    state: &AppState,
    outcome: PageOutcome<T>,
    path: &str,
    params: RetryParams,
    missing: &str,
) -> Response {
    match outcome {
        PageOutcome::Unavailable(error) => failure_page(state, path, params, &error, None),
        PageOutcome::Detailed { error, detail } => {
            failure_page(state, path, params, &error, Some(&detail))
        }
        PageOutcome::Content(_) | PageOutcome::Empty | PageOutcome::NotFound => {
            not_found(state, missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_retry_backoff() {
        let first = UiRetry::after("/templates", 0, true);
        assert!(first.auto_reload);
        assert_eq!(first.delay_secs, 1);
        assert_eq!(first.retry_url, "/templates?retry=1");
        assert_eq!(first.manual_url, "/templates");

        assert_eq!(UiRetry::after("/templates", 1, true).delay_secs, 2);
        assert_eq!(UiRetry::after("/templates", 2, true).delay_secs, 4);

        let exhausted = UiRetry::after("/templates", 3, true);
        assert!(!exhausted.auto_reload);
    }

    #[test]
    fn test_retry_param_is_lenient() {
        let params = |raw: Option<&str>| RetryParams {
            retry: raw.map(str::to_string),
        };
        assert_eq!(params(None).previous(), 0);
        assert_eq!(params(Some("2")).previous(), 2);
        assert_eq!(params(Some(" 1 ")).previous(), 1);
        assert_eq!(params(Some("abc")).previous(), 0);
        assert_eq!(params(Some("-1")).previous(), 0);
        assert_eq!(params(Some("99999999999")).previous(), 0);
    }

    #[test]
    fn test_no_auto_reload_for_permanent_failures() {
        assert!(!UiRetry::after("/templates", 0, false).auto_reload);
    }
}
