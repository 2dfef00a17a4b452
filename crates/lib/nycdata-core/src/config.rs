//! Pure-data tuning for the reliability layer.

use std::time::Duration;

use crate::reliability::{PageOptions, RetryPolicy};

/// Hard caps applied before any request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_days: i64,
    pub max_limit: i64,
    pub max_aggregated_limit: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_days: 365,
            max_limit: 5_000,
            max_aggregated_limit: 50_000,
        }
    }
}

/// Cache lifetime tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Fast-moving feeds such as open 311 requests.
    Short,
    Default,
    /// Slow-moving reference data such as tax lots.
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilityConfig {
    pub limits: Limits,
    pub ttl_short: Duration,
    pub ttl_default: Duration,
    pub ttl_long: Duration,
    pub cache_capacity: usize,
    pub retry: RetryPolicy,
    pub page_size: usize,
    pub max_pages: usize,
    pub rate_window: Duration,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            ttl_short: Duration::from_secs(5 * 60),
            ttl_default: Duration::from_secs(15 * 60),
            ttl_long: Duration::from_secs(60 * 60),
            cache_capacity: 500,
            retry: RetryPolicy::default(),
            page_size: 1_000,
            max_pages: 50,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl ReliabilityConfig {
    #[must_use]
    pub const fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn ttl(&self, tier: CacheTtl) -> Duration {
        match tier {
            CacheTtl::Short => self.ttl_short,
            CacheTtl::Default => self.ttl_default,
            CacheTtl::Long => self.ttl_long,
        }
    }

    /// Paging bounds for a query that wants at most `max_records` rows.
    #[must_use]
    pub fn page_options(&self, max_records: usize) -> PageOptions {
        PageOptions {
            page_size: self.page_size.min(max_records).max(1),
            max_records,
            max_pages: self.max_pages,
        }
    }
}
