//! Per-identity request rate governing.
//!
//! One [`RateGovernor`] is built at startup and shared by the router
//! middleware (public pages and API) and the write-path services (contact and
//! order). A background sweeper started with [`spawn_sweeper`] drops elapsed
//! windows and is aborted when the server shuts down.

mod clock;
mod config;
mod governor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Category, CategoryLimit, GovernorConfig, DEFAULT_ALLOW_LIST};
pub use governor::{spawn_sweeper, Admission, RateGovernor};

/// Value for a `Retry-After` header: whole seconds, rounded up, at least 1.
pub fn retry_after_secs(retry_after: std::time::Duration) -> u64 {
    let secs = retry_after.as_secs();
    let rounded = if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    };
    rounded.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }
}
