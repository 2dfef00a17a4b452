//! Builders for the uniform response envelope.

use nycdata_model::schema::Dataset;
use nycdata_model::{
    Envelope, ErrorBody, ErrorEnvelope, Insights, NormalizedRecord, QueryWindow, SuccessEnvelope,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::reliability::RateSnapshot;

/// Accumulates window, metadata, and insights for a success envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    source: String,
    event_type: String,
    window: Option<QueryWindow>,
    meta: Map<String, Value>,
    insights: Option<Insights>,
}

impl EnvelopeBuilder {
    #[must_use]
    pub fn new(dataset: &Dataset, event_type: &str) -> Self {
        let mut meta = Map::new();
        meta.insert("datasetId".to_string(), Value::from(dataset.id));
        meta.insert("datasetName".to_string(), Value::from(dataset.name));
        meta.insert("agency".to_string(), Value::from(dataset.agency));
        Self {
            source: dataset.source.to_string(),
            event_type: event_type.to_string(),
            window: None,
            meta,
            insights: None,
        }
    }

    #[must_use]
    pub const fn window(mut self, window: QueryWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Adds a metadata entry. Values that fail to serialize become null.
    #[must_use]
    pub fn meta(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.meta.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn insights(mut self, insights: Insights) -> Self {
        self.insights = Some(insights);
        self
    }

    /// Search envelope: `count` is the number of records.
    #[must_use]
    pub fn search(self, records: Vec<NormalizedRecord>) -> Envelope {
        let count = records.len() as u64;
        self.finish(records, count)
    }

    /// Aggregation envelope: `count` is the sum of each record's `value`.
    #[must_use]
    pub fn aggregate(self, records: Vec<NormalizedRecord>) -> Envelope {
        let total: f64 = records
            .iter()
            .filter_map(|record| record.value)
            .filter(|value| value.is_finite() && *value > 0.0)
            .sum();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = total.round() as u64;
        self.finish(records, count)
    }

    fn finish(self, records: Vec<NormalizedRecord>, count: u64) -> Envelope {
        Envelope::Success(SuccessEnvelope {
            success: true,
            source: self.source,
            event_type: self.event_type,
            window: self.window,
            count,
            records,
            meta: self.meta,
            insights: self.insights,
        })
    }
}

/// Failure envelope carrying the error taxonomy and, for upstream failures,
/// the advisory request rate at the time.
#[must_use]
pub fn error_envelope(err: &CoreError, rate: Option<RateSnapshot>) -> Envelope {
    let mut details = err.details();
    if let (Some(snapshot), Value::Object(map)) = (rate, &mut details) {
        map.insert(
            "rateLimit".to_string(),
            serde_json::to_value(snapshot).unwrap_or(Value::Null),
        );
    }
    Envelope::Failure(ErrorEnvelope {
        success: false,
        error: ErrorBody {
            kind: err.kind().to_string(),
            message: err.to_string(),
            details,
            guidance: err.guidance(),
        },
    })
}
