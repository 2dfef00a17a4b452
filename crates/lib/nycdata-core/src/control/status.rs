use nycdata_model::schema::DATASETS;
use serde::Serialize;

use crate::reliability::RateSnapshot;
use crate::source::RowSource;

use super::OpenDataControl;

/// Advisory view of the reliability layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub rate: RateSnapshot,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub geo_memo_entries: usize,
    pub caps: CapsView,
    pub ttl_secs: TtlView,
    pub datasets: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsView {
    pub max_days: i64,
    pub max_limit: i64,
    pub max_aggregated_limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlView {
    pub short: u64,
    pub default: u64,
    pub long: u64,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Reports request rate, cache occupancy, and configured caps.
    pub async fn service_status(&self) -> ServiceStatus {
        let limits = self.rate.limits();
        ServiceStatus {
            rate: self.rate.snapshot(),
            cache_entries: self.cache.len().await,
            cache_capacity: self.cache.capacity(),
            geo_memo_entries: self.geo.len(),
            caps: CapsView {
                max_days: limits.max_days,
                max_limit: limits.max_limit,
                max_aggregated_limit: limits.max_aggregated_limit,
            },
            ttl_secs: TtlView {
                short: self.config.ttl_short.as_secs(),
                default: self.config.ttl_default.as_secs(),
                long: self.config.ttl_long.as_secs(),
            },
            datasets: DATASETS.iter().map(|dataset| dataset.id).collect(),
        }
    }
}
