use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Limits;
use crate::error::CoreError;

/// Advisory view of recent request volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub requests_in_window: u64,
    pub window_secs: u64,
    pub requests_per_minute: f64,
}

#[derive(Debug)]
struct WindowState {
    started: Instant,
    count: u64,
}

/// Fixed-window request counter plus pre-flight cap checks.
///
/// The counter only feeds reporting. It never delays or blocks a request.
#[derive(Debug)]
pub struct RateTracker {
    window: Duration,
    limits: Limits,
    state: Mutex<WindowState>,
}

impl RateTracker {
    #[must_use]
    pub fn new(window: Duration, limits: Limits) -> Self {
        Self {
            window: window.max(Duration::from_secs(1)),
            limits,
            state: Mutex::new(WindowState {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Counts one outbound request.
    pub fn record(&self) {
        let now = Instant::now();
        if let Ok(mut state) = self.state.lock() {
            self.roll(&mut state, now);
            state.count += 1;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> RateSnapshot {
        let now = Instant::now();
        let count = self.state.lock().map_or(0, |mut state| {
            self.roll(&mut state, now);
            state.count
        });
        let window_secs = self.window.as_secs();
        #[allow(clippy::cast_precision_loss)]
        let requests_per_minute = count as f64 * 60.0 / self.window.as_secs_f64();
        RateSnapshot {
            requests_in_window: count,
            window_secs,
            requests_per_minute: (requests_per_minute * 100.0).round() / 100.0,
        }
    }

    /// Rejects a proposed query that exceeds the configured hard caps.
    ///
    /// Aggregation queries are held to the aggregated-limit cap instead of the
    /// per-record limit.
    ///
    /// # Errors
    /// Returns `CoreError::RateLimitExceeded` naming the offending parameter.
    pub fn check_caps(
        &self,
        days: Option<i64>,
        limit: Option<i64>,
        aggregated: bool,
    ) -> Result<(), CoreError> {
        if let Some(days) = days
            && days > self.limits.max_days
        {
            return Err(exceeded("days", days, self.limits.max_days));
        }
        if let Some(limit) = limit {
            let max = if aggregated {
                self.limits.max_aggregated_limit
            } else {
                self.limits.max_limit
            };
            if limit > max {
                return Err(exceeded("limit", limit, max));
            }
        }
        Ok(())
    }

    fn roll(&self, state: &mut WindowState, now: Instant) {
        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.count = 0;
        }
    }
}

fn exceeded(parameter: &'static str, requested: i64, max: i64) -> CoreError {
    CoreError::RateLimitExceeded {
        parameter: parameter.to_string(),
        requested,
        max,
    }
}
