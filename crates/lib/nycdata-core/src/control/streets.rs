use chrono::Local;
use nycdata_model::schema::fields::closures;
use nycdata_model::schema::{EVENT_STREET_CLOSURE, STREET_CLOSURES};
use nycdata_model::{Envelope, Insights, NormalizedRecord, Row};
use serde::{Deserialize, Serialize};

use crate::config::CacheTtl;
use crate::dedup::{DedupKey, deduplicate, merge_into_list, seed_list};
use crate::envelope::EnvelopeBuilder;
use crate::error::CoreResult;
use crate::fields::{str_field, timestamp_field};
use crate::metrics::{closure_activity, top_values};
use crate::soql::{self, SoqlQuery};
use crate::source::RowSource;
use crate::validate::{ValidationBatch, validate_borough, validate_int_range, validate_text};
use crate::window::{compute_window, kind_for_days};

use super::normalize::{RowShape, normalize_row};
use super::{DAYS_RANGE, LIMIT_RANGE, OpenDataControl, TEXT_MAX_LEN, record_cap, scope_label};

/// A closure is one segment over one work period.
const KEY_FIELDS: [&str; 3] = [
    closures::SEGMENT_ID,
    closures::WORK_START,
    closures::WORK_END,
];

const SHAPE: RowShape = RowShape {
    timestamp: Some(closures::WORK_START),
    topic: Some(closures::ON_STREET),
    borough: Some(closures::BOROUGH_CODE),
    community_district: None,
    bbl: None,
    lat: None,
    lon: None,
};

/// Filters for DOT street closures overlapping a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetClosuresRequest {
    pub borough: Option<String>,
    pub days: Option<f64>,
    /// Substring of the closed street's name.
    pub street: Option<String>,
    pub limit: Option<f64>,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Lists street closures whose work period overlaps the window.
    ///
    /// Permit rows for the same segment and period are merged, accumulating
    /// their purposes, before active and inactive closures are counted.
    pub async fn street_closures(&self, request: StreetClosuresRequest) -> Envelope {
        let result = self.try_street_closures(request).await;
        self.respond("street_closures", result)
    }

    async fn try_street_closures(&self, request: StreetClosuresRequest) -> CoreResult<Envelope> {
        let mut batch = ValidationBatch::new();
        let borough = batch.check("borough", validate_borough(request.borough.as_deref()));
        let days = batch.check("days", validate_int_range("days", request.days, DAYS_RANGE));
        let street = batch.check(
            "street",
            validate_text("street", request.street.as_deref(), TEXT_MAX_LEN),
        );
        let limit = batch.check("limit", validate_int_range("limit", request.limit, LIMIT_RANGE));
        let filters = batch.finish()?;

        let borough = borough.flatten();
        let days = days.unwrap_or(DAYS_RANGE.default);
        let limit = limit.unwrap_or(LIMIT_RANGE.default);
        self.rate.check_caps(Some(days), Some(limit), false)?;
        let window = compute_window(kind_for_days(days), Some(days))?;

        let query = SoqlQuery::new()
            .and_where(soql::overlaps(
                closures::WORK_START,
                closures::WORK_END,
                window.start,
                window.end,
            ))
            .and_where_opt(
                borough.map(|borough| soql::eq_escaped(closures::BOROUGH_CODE, borough.dot_code())),
            )
            .and_where_opt(
                street
                    .flatten()
                    .map(|text| soql::contains_escaped(closures::ON_STREET, &text)),
            )
            .order(format!(
                "{} DESC, {} ASC",
                closures::WORK_START,
                closures::SEGMENT_ID
            ));

        let fetched = self
            .fetch(&STREET_CLOSURES, &query, record_cap(limit), CacheTtl::Short)
            .await?;
        let outcome = merge_closures(fetched.data);
        let stats = outcome.stats();

        let activity = closure_activity(
            outcome.deduplicated.iter().map(|row| {
                (
                    timestamp_field(row, closures::WORK_START),
                    timestamp_field(row, closures::WORK_END),
                )
            }),
            Local::now().naive_local(),
        );
        let top_streets = top_values(
            outcome
                .deduplicated
                .iter()
                .filter_map(|row| str_field(row, closures::ON_STREET)),
            5,
        );

        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| normalize_row(&self.geo, &SHAPE, row, None, None))
            .collect();

        let mut insights = Insights::new(format!(
            "{} street closures {} over the last {days} days",
            records.len(),
            scope_label(borough)
        ))
        .with_takeaway(format!(
            "{} active now, {} finished, {} not yet started.",
            activity.active, activity.inactive, activity.upcoming
        ));
        if let Some(top) = top_streets.first() {
            insights = insights.with_takeaway(format!(
                "Most affected street: {} ({} closures).",
                top.value, top.count
            ));
        }

        Ok(EnvelopeBuilder::new(&STREET_CLOSURES, EVENT_STREET_CLOSURE)
            .window(window)
            .meta("filters", filters)
            .meta("cached", fetched.cached)
            .meta("deduplication", stats)
            .meta("activity", activity)
            .meta("topStreets", top_streets)
            .insights(insights)
            .search(records))
    }
}

/// Collapses permit rows by segment and work period into one closure each,
/// with every distinct purpose listed under `purposes`.
#[must_use]
pub fn merge_closures(rows: Vec<Row>) -> crate::dedup::DedupOutcome<Row> {
    let seeded = rows
        .into_iter()
        .map(|mut row| {
            seed_list(&mut row, closures::PURPOSE, closures::PURPOSES);
            row
        })
        .collect();
    deduplicate(
        seeded,
        |row| DedupKey::from_fields(row, &KEY_FIELDS),
        |existing, incoming| {
            merge_into_list(existing, &incoming, closures::PURPOSE, closures::PURPOSES);
        },
    )
}
