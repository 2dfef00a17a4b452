use std::collections::BTreeMap;
use std::sync::Arc;

use nycdata_model::schema::Dataset;
use nycdata_model::{Borough, Envelope, Row};
use tracing::{debug, warn};

use crate::config::{CacheTtl, ReliabilityConfig};
use crate::envelope::error_envelope;
use crate::error::{CoreError, CoreResult};
use crate::geo::GeoEnricher;
use crate::reliability::{Cached, QueryCache, RateTracker, auto_paginate, with_retry};
use crate::soql::SoqlQuery;
use crate::source::RowSource;
use crate::validate::RangeOptions;

pub mod buildings;
pub mod complaints;
pub mod events;
pub mod housing;
mod normalize;
pub mod status;
pub mod streets;

pub use buildings::BuildingProfileRequest;
pub use complaints::{ComplaintSearchRequest, ComplaintTrendsRequest};
pub use events::PermittedEventsRequest;
pub use housing::HousingViolationsRequest;
pub use status::ServiceStatus;
pub use streets::StreetClosuresRequest;

/// Sanity bounds for `days`; the configured hard cap is checked afterwards.
pub(crate) const DAYS_RANGE: RangeOptions = RangeOptions::new(1, 3_650, 90);

/// Sanity bounds for `limit`; the configured hard cap is checked afterwards.
pub(crate) const LIMIT_RANGE: RangeOptions = RangeOptions::new(1, 1_000_000, 100);

pub(crate) const TEXT_MAX_LEN: usize = 100;

pub(crate) fn record_cap(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

/// `"in BRONX"` or `"citywide"` for headlines.
pub(crate) fn scope_label(borough: Option<Borough>) -> String {
    borough.map_or_else(|| "citywide".to_string(), |borough| format!("in {borough}"))
}

/// Dataset operations over an injected row source and reliability state.
///
/// Cache, rate tracker, and geo memo are shared by every clone.
pub struct OpenDataControl<S> {
    source: Arc<S>,
    cache: Arc<QueryCache<Vec<Row>>>,
    rate: Arc<RateTracker>,
    geo: Arc<GeoEnricher>,
    config: ReliabilityConfig,
}

impl<S> Clone for OpenDataControl<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            rate: Arc::clone(&self.rate),
            geo: Arc::clone(&self.geo),
            config: self.config,
        }
    }
}

impl<S: RowSource> OpenDataControl<S> {
    /// Builds a control plane with fresh cache, rate, and geo state.
    pub fn new(source: S, config: ReliabilityConfig) -> Self {
        Self::from_parts(
            Arc::new(source),
            Arc::new(QueryCache::new(config.cache_capacity)),
            Arc::new(RateTracker::new(config.rate_window, config.limits)),
            Arc::new(GeoEnricher::new()),
            config,
        )
    }

    /// Builds a control plane around existing shared state.
    pub const fn from_parts(
        source: Arc<S>,
        cache: Arc<QueryCache<Vec<Row>>>,
        rate: Arc<RateTracker>,
        geo: Arc<GeoEnricher>,
        config: ReliabilityConfig,
    ) -> Self {
        Self {
            source,
            cache,
            rate,
            geo,
            config,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache<Vec<Row>> {
        &self.cache
    }

    #[must_use]
    pub fn rate(&self) -> &RateTracker {
        &self.rate
    }

    #[must_use]
    pub fn geo(&self) -> &GeoEnricher {
        &self.geo
    }

    #[must_use]
    pub const fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// Runs `query` through cache, pagination, and retry.
    ///
    /// The cache key covers the query and `max_records`; page offsets are not
    /// part of it. Each attempt against the source is counted by the rate
    /// tracker.
    pub(crate) async fn fetch(
        &self,
        dataset: &Dataset,
        query: &SoqlQuery,
        max_records: usize,
        ttl: CacheTtl,
    ) -> CoreResult<Cached<Vec<Row>>> {
        let key_params: BTreeMap<String, String> = query.clone().limit(max_records).to_params();
        let options = self.config.page_options(max_records);
        let policy = self.config.retry;

        self.cache
            .with_cache(dataset.id, &key_params, self.config.ttl(ttl), || {
                auto_paginate(options, |offset, limit| {
                    let params = query.page(offset, limit).to_params();
                    async move {
                        with_retry(&policy, CoreError::is_retryable, |_attempt| {
                            self.rate.record();
                            self.source.fetch_rows(dataset.id, &params)
                        })
                        .await
                    }
                })
            })
            .await
    }

    /// Converts an operation result into an envelope, attaching rate context
    /// to failures that reached the network.
    pub(crate) fn respond(&self, operation: &str, result: CoreResult<Envelope>) -> Envelope {
        match result {
            Ok(envelope) => {
                debug!(operation, "operation succeeded");
                envelope
            }
            Err(err) => {
                let rate = matches!(err, CoreError::Upstream { .. } | CoreError::Transient(_))
                    .then(|| self.rate.snapshot());
                warn!(operation, kind = err.kind(), error = %err, "operation failed");
                error_envelope(&err, rate)
            }
        }
    }
}
