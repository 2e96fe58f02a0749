//! Fault taxonomy, classification, and bounded retries.
//!
//! Every failure from an external call (database, mail API) is carried as a
//! [`Fault`], mapped to a [`ClassifiedError`] by [`classify`], and retried by
//! [`run_with_retry`] only when the classification says it may heal.

mod classify;
mod retry;

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;

pub use classify::{classify, CONNECTION_CODES};
pub use retry::{run_with_retry, RetryPolicy};

/// A raw failure: a message plus an optional machine code.
///
/// Codes follow whatever the source speaks: SQLSTATE values, OS errno names,
/// HTTP status codes, or the SQLite-specific names assigned in
/// [`Fault::from`] for diesel errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
    pub code: Option<String>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Fault raised when an operation outlives its deadline.
    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::with_code(
            "ETIMEDOUT",
            format!("{} timed out after {}ms", operation, after.as_millis()),
        )
    }

    /// Prefix the message with where the fault came from.
    pub fn context(mut self, context: &str) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }
}

/// Map SQLite's message-only failures onto stable codes.
fn sqlite_code(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("database is locked") || lower.contains("database is busy") {
        Some("SQLITE_BUSY")
    } else if lower.contains("unable to open database") {
        Some("SQLITE_CANTOPEN")
    } else if lower.contains("connection pool exhausted") {
        Some("POOL_EXHAUSTED")
    } else {
        None
    }
}

impl From<diesel::result::Error> for Fault {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match &e {
            Error::DatabaseError(kind, info) => {
                let code = match kind {
                    DatabaseErrorKind::UniqueViolation => Some("23505"),
                    DatabaseErrorKind::NotNullViolation => Some("23502"),
                    DatabaseErrorKind::CheckViolation => Some("23514"),
                    DatabaseErrorKind::ForeignKeyViolation => Some("23503"),
                    DatabaseErrorKind::ClosedConnection
                    | DatabaseErrorKind::UnableToSendCommand => Some("08006"),
                    _ => sqlite_code(info.message()),
                };
                Self {
                    message: info.message().to_string(),
                    code: code.map(str::to_string),
                }
            }
            other => Self::new(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Fault {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            Some("ETIMEDOUT".to_string())
        } else if e.is_connect() {
            Some("ECONNREFUSED".to_string())
        } else {
            e.status().map(|s| s.as_u16().to_string())
        };
        Self {
            message: e.to_string(),
            code,
        }
    }
}

/// Stable fault categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectionError,
    Timeout,
    PermissionError,
    ConfigError,
    ValidationError,
    EmailServiceError,
    MediaLoadError,
    NetworkError,
    RateLimited,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::PermissionError => "permission_error",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::EmailServiceError => "email_service_error",
            ErrorKind::MediaLoadError => "media_load_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a failure of this kind can heal on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionError
                | ErrorKind::Timeout
                | ErrorKind::EmailServiceError
                | ErrorKind::MediaLoadError
                | ErrorKind::NetworkError
        )
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::ConnectionError
            | ErrorKind::Timeout
            | ErrorKind::EmailServiceError
            | ErrorKind::MediaLoadError
            | ErrorKind::NetworkError => 503,
            ErrorKind::ValidationError => 400,
            ErrorKind::PermissionError => 403,
            ErrorKind::RateLimited => 429,
            ErrorKind::ConfigError | ErrorKind::Unknown => 500,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => {
                "Our catalog is temporarily unreachable. Please try again in a moment."
            }
            ErrorKind::Timeout => "The request took too long to complete. Please try again.",
            ErrorKind::PermissionError => "This content is not available.",
            ErrorKind::ConfigError => {
                "The site is misconfigured. Our team has been notified."
            }
            ErrorKind::ValidationError => "Some of the submitted information is invalid.",
            ErrorKind::EmailServiceError => {
                "We could not send your message right now. Please try again shortly."
            }
            ErrorKind::MediaLoadError => "Some images could not be loaded. Please try again.",
            ErrorKind::NetworkError => "A network problem occurred. Please check your connection.",
            ErrorKind::RateLimited => "Too many requests. Please wait before trying again.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault mapped onto the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub http_status: u16,
    pub user_message: String,
}

impl ClassifiedError {
    pub fn of(kind: ErrorKind) -> Self {
        Self {
            kind,
            retryable: kind.is_retryable(),
            http_status: kind.http_status(),
            user_message: kind.user_message().to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    fn db_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_string()))
    }

    #[test]
    fn test_unique_violation_gets_sqlstate() {
        let fault = Fault::from(db_error(
            DatabaseErrorKind::UniqueViolation,
            "UNIQUE constraint failed: templates.slug",
        ));
        assert_eq!(fault.code.as_deref(), Some("23505"));
        assert!(fault.message.contains("templates.slug"));
    }

    #[test]
    fn test_locked_database_maps_to_busy() {
        let fault = Fault::from(db_error(DatabaseErrorKind::Unknown, "database is locked"));
        assert_eq!(fault.code.as_deref(), Some("SQLITE_BUSY"));
    }

    #[test]
    fn test_closed_connection_maps_to_connection_failure() {
        let fault = Fault::from(db_error(
            DatabaseErrorKind::ClosedConnection,
            "server closed the connection",
        ));
        assert_eq!(fault.code.as_deref(), Some("08006"));
    }

    #[test]
    fn test_not_found_has_no_code() {
        let fault = Fault::from(DieselError::NotFound);
        assert_eq!(fault.code, None);
    }

    #[test]
    fn test_timeout_fault() {
        let fault = Fault::timeout("catalog.list", Duration::from_millis(5000));
        assert_eq!(fault.code.as_deref(), Some("ETIMEDOUT"));
        assert_eq!(fault.message, "catalog.list timed out after 5000ms");
    }

    #[test]
    fn test_context_prefixes_message() {
        let fault = Fault::new("503 Service Unavailable").context("email service");
        assert_eq!(fault.to_string(), "email service: 503 Service Unavailable");
    }

    #[test]
    fn test_taxonomy_statuses() {
        assert_eq!(ClassifiedError::of(ErrorKind::ConnectionError).http_status, 503);
        assert_eq!(ClassifiedError::of(ErrorKind::ValidationError).http_status, 400);
        assert_eq!(ClassifiedError::of(ErrorKind::RateLimited).http_status, 429);
        assert_eq!(ClassifiedError::of(ErrorKind::Unknown).http_status, 500);
        assert!(ClassifiedError::of(ErrorKind::MediaLoadError).retryable);
        assert!(!ClassifiedError::of(ErrorKind::ConfigError).retryable);
        assert_eq!(
            ClassifiedError::of(ErrorKind::PermissionError).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
