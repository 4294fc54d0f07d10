use crate::config::RateLimitConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};

/// Token bucket guarding requests to one domain
pub type DomainLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Lazily created per-domain token buckets, keyed by hostname
///
/// Every domain gets its own limiter with the same (rate, burst) quota on
/// first use; the limiter is reused afterwards. Entries are never evicted, so
/// the map grows with the number of distinct hosts seen by the process.
/// The limiters themselves are thread-safe once handed out.
pub struct DomainRateLimiter {
    limiters: Mutex<HashMap<String, Arc<DomainLimiter>>>,
    quota: Quota,
}

impl DomainRateLimiter {
    /// Creates a limiter set admitting `burst` immediate requests per domain,
    /// refilled at `requests_per_second`
    pub fn new(requests_per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            quota: Quota::per_second(requests_per_second).allow_burst(burst),
        }
    }

    /// Builds the limiter set from configuration
    ///
    /// Zero values (rejected by config validation) are raised to one.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        Self::new(rate, burst)
    }

    /// Returns the limiter for exactly this domain string, creating it on first use
    ///
    /// Lookup and creation happen under one lock, so concurrent first
    /// requests for a domain share a single limiter.
    pub fn get_limiter(&self, domain: &str) -> Arc<DomainLimiter> {
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        limiters
            .entry(domain.to_string())
            .or_insert_with(|| {
                tracing::trace!("Creating rate limiter for domain {}", domain);
                Arc::new(RateLimiter::direct(self.quota))
            })
            .clone()
    }

    /// Waits until the domain's bucket yields a token
    pub async fn until_ready(&self, domain: &str) {
        let limiter = self.get_limiter(domain);
        limiter.until_ready().await;
    }

    /// Number of domains with a limiter
    pub fn domain_count(&self) -> usize {
        self.limiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for DomainRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainRateLimiter")
            .field("quota", &self.quota)
            .field("domains", &self.domain_count())
            .finish()
    }
}
