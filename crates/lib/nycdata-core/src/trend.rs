//! Week-over-week trend over a daily period series.

use std::collections::BTreeMap;

use nycdata_model::PeriodCount;
use serde::Serialize;

/// Periods in each of the recent and previous sub-windows.
pub const TREND_SPAN: usize = 7;

/// Reported instead of +infinity when the previous window was empty.
pub const CLAMP_PERCENT: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Trend {
    /// Fewer than two full sub-windows of history.
    Unavailable,
    #[serde(rename_all = "camelCase")]
    Available {
        recent_average: f64,
        previous_average: f64,
        percent_change: f64,
        direction: TrendDirection,
    },
}

impl Trend {
    #[must_use]
    pub const fn direction(&self) -> Option<TrendDirection> {
        match self {
            Self::Unavailable => None,
            Self::Available { direction, .. } => Some(*direction),
        }
    }

    #[must_use]
    pub const fn percent_change(&self) -> Option<f64> {
        match self {
            Self::Unavailable => None,
            Self::Available { percent_change, .. } => Some(*percent_change),
        }
    }
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums counts per period, in chronological (lexicographic) period order.
#[must_use]
pub fn totals_by_period(series: &[PeriodCount]) -> Vec<(String, u64)> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for point in series {
        let total = totals.entry(point.period.as_str()).or_insert(0);
        *total = total.saturating_add(point.count);
    }
    totals
        .into_iter()
        .map(|(period, count)| (period.to_string(), count))
        .collect()
}

/// Compares the last seven periods with the seven before them.
///
/// Topics sharing a period are summed first.
#[must_use]
pub fn compute_trend(series: &[PeriodCount]) -> Trend {
    let totals = totals_by_period(series);
    if totals.len() < TREND_SPAN * 2 {
        return Trend::Unavailable;
    }
    let tail = &totals[totals.len() - TREND_SPAN * 2..];
    let (previous, recent) = tail.split_at(TREND_SPAN);
    let previous_average = average(previous);
    let recent_average = average(recent);

    let percent_change = if previous_average > 0.0 {
        round2((recent_average - previous_average) / previous_average * 100.0)
    } else if recent_average > 0.0 {
        CLAMP_PERCENT
    } else {
        0.0
    };

    let direction = if percent_change > 0.0 {
        TrendDirection::Increasing
    } else if percent_change < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Trend::Available {
        recent_average: round2(recent_average),
        previous_average: round2(previous_average),
        percent_change,
        direction,
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(window: &[(String, u64)]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|(_, count)| *count as f64).sum::<f64>() / window.len() as f64
}
