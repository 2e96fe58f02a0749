//! Fixed-window request governor keyed by (identity, category).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::config::{Category, GovernorConfig};

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    identity: String,
    category: Category,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    window_start: Instant,
    window: Duration,
    count: u32,
}

impl WindowEntry {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window
    }
}

/// In-process request governor.
///
/// Counts admitted requests per identity and category inside fixed windows.
/// The table is bounded by `capacity`; inserting a new key when full first
/// drops elapsed windows and then evicts the oldest window. State lives only
/// in memory, so a restart admits everyone again.
pub struct RateGovernor {
    config: GovernorConfig,
    entries: Mutex<HashMap<WindowKey, WindowEntry>>,
    clock: Arc<dyn Clock>,
}

impl RateGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GovernorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<WindowKey, WindowEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request for `identity` under `category`.
    pub fn admit(&self, identity: &str, category: Category) -> Admission {
        let limit = self.config.limit_for(category);

        if self.config.is_allow_listed(identity) {
            return Admission::Allowed {
                remaining: limit.max_requests,
            };
        }

        let now = self.clock.now();
        let key = WindowKey {
            identity: identity.to_string(),
            category,
        };

        let mut entries = self.entries();

        if let Some(entry) = entries.get_mut(&key) {
            if entry.expired(now) {
                *entry = WindowEntry {
                    window_start: now,
                    window: limit.window,
                    count: 1,
                };
                return Admission::Allowed {
                    remaining: limit.max_requests.saturating_sub(1),
                };
            }

            if entry.count < limit.max_requests {
                entry.count += 1;
                return Admission::Allowed {
                    remaining: limit.max_requests - entry.count,
                };
            }

            let retry_after = (entry.window_start + entry.window).saturating_duration_since(now);
            debug!(identity, category = %category, ?retry_after, "Request denied");
            return Admission::Denied { retry_after };
        }

        if limit.max_requests == 0 {
            return Admission::Denied {
                retry_after: limit.window,
            };
        }

        Self::make_room(&mut entries, self.config.capacity.max(1), now);
        entries.insert(
            key,
            WindowEntry {
                window_start: now,
                window: limit.window,
                count: 1,
            },
        );

        Admission::Allowed {
            remaining: limit.max_requests - 1,
        }
    }

    fn make_room(entries: &mut HashMap<WindowKey, WindowEntry>, capacity: usize, now: Instant) {
        if entries.len() < capacity {
            return;
        }

        entries.retain(|_, entry| !entry.expired(now));

        while entries.len() >= capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.window_start)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Remove every elapsed window. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Run [`RateGovernor::sweep`] on the configured interval until aborted.
pub fn spawn_sweeper(governor: Arc<RateGovernor>) -> JoinHandle<()> {
    let period = governor.config.sweep_interval.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = governor.sweep();
            if removed > 0 {
                debug!(removed, remaining = governor.len(), "Swept rate windows");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::clock::ManualClock;
    use crate::rate_limit::config::CategoryLimit;

    fn governor_with_clock(config: GovernorConfig) -> (RateGovernor, ManualClock) {
        let clock = ManualClock::default();
        let governor = RateGovernor::with_clock(config, Arc::new(clock.clone()));
        (governor, clock)
    }

    #[test]
    fn test_contact_budget_and_window_reset() {
        let (governor, clock) = governor_with_clock(GovernorConfig::default());
        let ip = "198.51.100.4";

        assert_eq!(
            governor.admit(ip, Category::Contact),
            Admission::Allowed { remaining: 2 }
        );
        assert_eq!(
            governor.admit(ip, Category::Contact),
            Admission::Allowed { remaining: 1 }
        );
        assert_eq!(
            governor.admit(ip, Category::Contact),
            Admission::Allowed { remaining: 0 }
        );

        clock.advance(Duration::from_secs(100));
        assert_eq!(
            governor.admit(ip, Category::Contact),
            Admission::Denied {
                retry_after: Duration::from_secs(500)
            }
        );

        clock.advance(Duration::from_secs(500));
        assert_eq!(
            governor.admit(ip, Category::Contact),
            Admission::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn test_categories_are_independent() {
        let (governor, _clock) = governor_with_clock(GovernorConfig::default());
        let ip = "198.51.100.4";

        assert!(governor.admit(ip, Category::Order).is_allowed());
        assert!(governor.admit(ip, Category::Order).is_allowed());
        assert!(!governor.admit(ip, Category::Order).is_allowed());

        assert!(governor.admit(ip, Category::Contact).is_allowed());
        assert!(governor.admit("198.51.100.5", Category::Order).is_allowed());
    }

    #[test]
    fn test_allow_listed_never_stored() {
        let (governor, _clock) = governor_with_clock(GovernorConfig::default());

        for _ in 0..50 {
            assert!(governor.admit("127.0.0.1", Category::Order).is_allowed());
            assert!(governor.admit("::1", Category::Contact).is_allowed());
        }
        assert!(governor.is_empty());
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let config = GovernorConfig {
            capacity: 5,
            ..Default::default()
        };
        let (governor, clock) = governor_with_clock(config);

        for i in 0..40 {
            clock.advance(Duration::from_millis(10));
            governor.admit(&format!("10.0.0.{}", i), Category::Public);
            assert!(governor.len() <= 5);
        }
        assert_eq!(governor.len(), 5);
    }

    #[test]
    fn test_eviction_prefers_expired_then_oldest() {
        let config = GovernorConfig {
            capacity: 2,
            public: CategoryLimit::new(30, 60),
            contact: CategoryLimit::new(3, 600),
            ..Default::default()
        };
        let (governor, clock) = governor_with_clock(config);

        governor.admit("a", Category::Contact);
        clock.advance(Duration::from_secs(1));
        governor.admit("b", Category::Public);

        // "b" expires, "a" is older but still live.
        clock.advance(Duration::from_secs(61));
        governor.admit("c", Category::Public);
        assert_eq!(governor.len(), 2);

        // "a" keeps its count because only the expired "b" was dropped.
        assert_eq!(
            governor.admit("a", Category::Contact),
            Admission::Allowed { remaining: 1 }
        );

        // Full with live windows: the oldest ("a") goes.
        governor.admit("d", Category::Public);
        assert_eq!(governor.len(), 2);
        assert_eq!(
            governor.admit("a", Category::Contact),
            Admission::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn test_sweep_removes_elapsed() {
        let (governor, clock) = governor_with_clock(GovernorConfig::default());
        governor.admit("a", Category::Public);
        governor.admit("b", Category::Contact);

        clock.advance(Duration::from_secs(61));
        assert_eq!(governor.sweep(), 1);
        assert_eq!(governor.len(), 1);

        clock.advance(Duration::from_secs(600));
        assert_eq!(governor.sweep(), 1);
        assert!(governor.is_empty());
    }

    #[test]
    fn test_zero_budget_denies() {
        let config = GovernorConfig {
            order: CategoryLimit::new(0, 300),
            ..Default::default()
        };
        let (governor, _clock) = governor_with_clock(config);
        assert!(!governor.admit("a", Category::Order).is_allowed());
        assert!(governor.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval() {
        let clock = ManualClock::default();
        let config = GovernorConfig {
            sweep_interval: Duration::from_secs(600),
            ..Default::default()
        };
        let governor = Arc::new(RateGovernor::with_clock(config, Arc::new(clock.clone())));
        governor.admit("a", Category::Public);

        let handle = spawn_sweeper(governor.clone());
        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert!(governor.is_empty());

        handle.abort();
    }
}
