//! Ordered fault classification rules.
//!
//! Rules are evaluated top to bottom and the first match wins. A known code
//! is checked against every rule before any message text is looked at, so a
//! driver code is never overridden by a word that happens to be in the
//! message. Availability failures come first; permission and configuration
//! failures sit right after so they are never retried.

use super::{ClassifiedError, ErrorKind, Fault};

/// Codes that mean the database or a remote service could not be reached.
pub const CONNECTION_CODES: &[&str] = &[
    "ECONNREFUSED",
    "ECONNRESET",
    "ENOTFOUND",
    "EAI_AGAIN",
    "08000",
    "08001",
    "08003",
    "08006",
    "57P01",
    "57P03",
    "53300",
    "SQLITE_BUSY",
    "SQLITE_CANTOPEN",
    "POOL_EXHAUSTED",
];

/// A single classification rule: matches on code or on a message substring.
struct Rule {
    kind: ErrorKind,
    codes: &'static [&'static str],
    needles: &'static [&'static str],
}

impl Rule {
    fn matches_code(&self, code: &str) -> bool {
        self.codes.iter().any(|known| known.eq_ignore_ascii_case(code))
    }

    fn matches_message(&self, message: &str) -> bool {
        self.needles.iter().any(|needle| message.contains(needle))
    }
}

const RULES: &[Rule] = &[
    Rule {
        kind: ErrorKind::ConnectionError,
        codes: CONNECTION_CODES,
        needles: &["connection refused", "database is locked", "too many connections"],
    },
    Rule {
        kind: ErrorKind::Timeout,
        codes: &["ETIMEDOUT", "57014"],
        needles: &["timeout", "timed out"],
    },
    Rule {
        kind: ErrorKind::PermissionError,
        codes: &["42501", "EACCES", "EPERM"],
        needles: &["permission denied"],
    },
    Rule {
        kind: ErrorKind::ConfigError,
        codes: &["3D000", "28P01", "28000", "EAUTH"],
        needles: &["configuration", "not configured", "missing environment"],
    },
    Rule {
        kind: ErrorKind::RateLimited,
        codes: &["429"],
        needles: &["rate limit", "too many requests"],
    },
    Rule {
        kind: ErrorKind::EmailServiceError,
        codes: &[],
        needles: &["email service", "smtp", "mail api"],
    },
    Rule {
        kind: ErrorKind::MediaLoadError,
        codes: &[],
        needles: &["image", "media"],
    },
    Rule {
        kind: ErrorKind::ValidationError,
        codes: &["23505", "23502", "23503", "23514", "22P02", "EINVAL"],
        needles: &["constraint", "invalid input", "validation"],
    },
    Rule {
        kind: ErrorKind::NetworkError,
        codes: &[],
        needles: &[
            "network",
            "fetch failed",
            "socket hang up",
            "dns",
            "connection closed",
            "broken pipe",
        ],
    },
];

/// Classify a fault. Total: anything unmatched is `Unknown`.
pub fn classify(fault: &Fault) -> ClassifiedError {
    let message = fault.message.to_lowercase();
    let code = fault.code.as_deref();

    let by_code = code.and_then(|code| RULES.iter().find(|rule| rule.matches_code(code)));
    let kind = by_code
        .or_else(|| RULES.iter().find(|rule| rule.matches_message(&message)))
        .map(|rule| rule.kind)
        .unwrap_or(ErrorKind::Unknown);

    ClassifiedError::of(kind)
}
