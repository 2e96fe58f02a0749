//! Governor policy: per-category budgets, capacity, and the allow-list.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Action categories with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// GET requests for rendered pages.
    Public,
    /// JSON endpoints under `/api`.
    Api,
    /// Contact form submissions.
    Contact,
    /// Order submissions.
    Order,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Public => "public",
            Category::Api => "api",
            Category::Contact => "contact",
            Category::Order => "order",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most `max_requests` admitted per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl CategoryLimit {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Identities that are never counted.
pub const DEFAULT_ALLOW_LIST: &[&str] = &["127.0.0.1", "::1", "localhost"];

/// Configuration for the [`RateGovernor`](super::RateGovernor).
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub public: CategoryLimit,
    pub api: CategoryLimit,
    pub contact: CategoryLimit,
    pub order: CategoryLimit,
    /// Maximum number of tracked (identity, category) windows.
    pub capacity: usize,
    /// How often the background sweep removes elapsed windows.
    pub sweep_interval: Duration,
    pub allow_list: HashSet<String>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            public: CategoryLimit::new(30, 60),
            api: CategoryLimit::new(20, 60),
            contact: CategoryLimit::new(3, 600),
            order: CategoryLimit::new(2, 300),
            capacity: 200,
            sweep_interval: Duration::from_secs(600),
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GovernorConfig {
    pub fn limit_for(&self, category: Category) -> CategoryLimit {
        match category {
            Category::Public => self.public,
            Category::Api => self.api,
            Category::Contact => self.contact,
            Category::Order => self.order,
        }
    }

    pub fn is_allow_listed(&self, identity: &str) -> bool {
        self.allow_list.contains(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = GovernorConfig::default();
        assert_eq!(config.limit_for(Category::Public), CategoryLimit::new(30, 60));
        assert_eq!(config.limit_for(Category::Api), CategoryLimit::new(20, 60));
        assert_eq!(config.limit_for(Category::Contact), CategoryLimit::new(3, 600));
        assert_eq!(config.limit_for(Category::Order), CategoryLimit::new(2, 300));
        assert_eq!(config.capacity, 200);
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_loopback_allow_listed() {
        let config = GovernorConfig::default();
        assert!(config.is_allow_listed("127.0.0.1"));
        assert!(config.is_allow_listed("::1"));
        assert!(config.is_allow_listed("localhost"));
        assert!(!config.is_allow_listed("203.0.113.9"));
    }
}
