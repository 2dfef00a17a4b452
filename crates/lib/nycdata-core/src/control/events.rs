use nycdata_model::schema::fields::events;
use nycdata_model::schema::{EVENT_PERMITTED_EVENT, PERMITTED_EVENTS};
use nycdata_model::{Envelope, Insights, NormalizedRecord, Row};
use serde::{Deserialize, Serialize};

use crate::config::CacheTtl;
use crate::dedup::{DedupKey, DedupOutcome, deduplicate, merge_into_list, seed_list};
use crate::envelope::EnvelopeBuilder;
use crate::error::CoreResult;
use crate::fields::str_field;
use crate::metrics::top_values;
use crate::soql::{self, SoqlQuery};
use crate::source::RowSource;
use crate::validate::{ValidationBatch, validate_borough, validate_int_range, validate_text};
use crate::window::{compute_window, kind_for_days};

use super::normalize::{RowShape, normalize_row};
use super::{DAYS_RANGE, LIMIT_RANGE, OpenDataControl, TEXT_MAX_LEN, record_cap, scope_label};

const SHAPE: RowShape = RowShape {
    timestamp: Some(events::START),
    topic: Some(events::EVENT_TYPE),
    borough: Some(events::BOROUGH),
    community_district: Some(events::COMMUNITY_BOARD),
    bbl: None,
    lat: None,
    lon: None,
};

/// Filters for permitted events starting within a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermittedEventsRequest {
    pub borough: Option<String>,
    pub days: Option<f64>,
    /// Substring of the event type, such as `Parade` or `Street Event`.
    pub event_type: Option<String>,
    pub limit: Option<f64>,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Lists permitted events, one per `event_id`, with every location the
    /// event occupies gathered under `event_locations`.
    pub async fn permitted_events(&self, request: PermittedEventsRequest) -> Envelope {
        let result = self.try_permitted_events(request).await;
        self.respond("permitted_events", result)
    }

    async fn try_permitted_events(&self, request: PermittedEventsRequest) -> CoreResult<Envelope> {
        let mut batch = ValidationBatch::new();
        let borough = batch.check("borough", validate_borough(request.borough.as_deref()));
        let days = batch.check("days", validate_int_range("days", request.days, DAYS_RANGE));
        let event_type = batch.check(
            "event_type",
            validate_text("event_type", request.event_type.as_deref(), TEXT_MAX_LEN),
        );
        let limit = batch.check("limit", validate_int_range("limit", request.limit, LIMIT_RANGE));
        let filters = batch.finish()?;

        let borough = borough.flatten();
        let days = days.unwrap_or(DAYS_RANGE.default);
        let limit = limit.unwrap_or(LIMIT_RANGE.default);
        self.rate.check_caps(Some(days), Some(limit), false)?;
        let window = compute_window(kind_for_days(days), Some(days))?;

        // The events feed spells boroughs in title case.
        let query = SoqlQuery::new()
            .and_where(soql::between(events::START, window.start, window.end))
            .and_where_opt(borough.map(|borough| {
                format!("upper({}) = {}", events::BOROUGH, soql::literal(borough.name()))
            }))
            .and_where_opt(
                event_type
                    .flatten()
                    .map(|text| soql::contains_escaped(events::EVENT_TYPE, &text)),
            )
            .order(format!("{} DESC, {} ASC", events::START, events::EVENT_ID));

        let fetched = self
            .fetch(&PERMITTED_EVENTS, &query, record_cap(limit), CacheTtl::Default)
            .await?;
        let outcome = merge_event_locations(fetched.data);
        let stats = outcome.stats();
        let top_types = top_values(
            outcome
                .deduplicated
                .iter()
                .filter_map(|row| str_field(row, events::EVENT_TYPE)),
            5,
        );

        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| normalize_row(&self.geo, &SHAPE, row, None, None))
            .collect();

        let mut insights = Insights::new(format!(
            "{} permitted events {} over the last {days} days",
            records.len(),
            scope_label(borough)
        ));
        if let Some(top) = top_types.first() {
            insights = insights.with_takeaway(format!(
                "Most common event type: {} ({} events).",
                top.value, top.count
            ));
        }

        Ok(EnvelopeBuilder::new(&PERMITTED_EVENTS, EVENT_PERMITTED_EVENT)
            .window(window)
            .meta("filters", filters)
            .meta("cached", fetched.cached)
            .meta("deduplication", stats)
            .meta("topEventTypes", top_types)
            .insights(insights)
            .search(records))
    }
}

/// The feed repeats an event once per location; fold those into one row.
#[must_use]
pub fn merge_event_locations(rows: Vec<Row>) -> DedupOutcome<Row> {
    let seeded = rows
        .into_iter()
        .map(|mut row| {
            seed_list(&mut row, events::LOCATION, events::LOCATIONS);
            row
        })
        .collect();
    deduplicate(
        seeded,
        |row| DedupKey::from_fields(row, &[events::EVENT_ID]),
        |existing, incoming| {
            merge_into_list(existing, &incoming, events::LOCATION, events::LOCATIONS);
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn gathers_locations_per_event() {
        let rows = [
            json!({"event_id": "501", "event_location": "5 AVENUE between 42 ST and 57 ST"}),
            json!({"event_id": "501", "event_location": "BROADWAY between 34 ST and 42 ST"}),
            json!({"event_id": "502", "event_location": "Central Park: Great Lawn"}),
            json!({"event_name": "unkeyed"}),
        ]
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
        let outcome = merge_event_locations(rows);
        assert_eq!(outcome.deduplicated.len(), 3);
        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(
            outcome.deduplicated[0]["event_locations"],
            json!([
                "5 AVENUE between 42 ST and 57 ST",
                "BROADWAY between 34 ST and 42 ST"
            ])
        );
        assert_eq!(outcome.deduplicated[2]["event_locations"], json!([]));
    }
}
