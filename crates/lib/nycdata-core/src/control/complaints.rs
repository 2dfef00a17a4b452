use chrono::Days;
use nycdata_model::schema::fields::sr311;
use nycdata_model::schema::{EVENT_311_COMPLAINT, EVENT_311_TREND, SERVICE_REQUESTS_311};
use nycdata_model::{Envelope, GeoInfo, Insights, NormalizedRecord, PeriodCount, QueryWindow, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CacheTtl;
use crate::dedup::{deduplicate_aggregated, deduplicate_rows};
use crate::envelope::EnvelopeBuilder;
use crate::error::CoreResult;
use crate::fields::{day_field, parse_timestamp, str_field, text_field, u64_field};
use crate::geo::GeoInput;
use crate::metrics::{ValueCount, top_values};
use crate::soql::{self, SoqlQuery};
use crate::source::RowSource;
use crate::trend::{Trend, compute_trend};
use crate::validate::{
    RangeOptions, ValidationBatch, validate_borough, validate_enum, validate_int_range,
    validate_text,
};
use crate::window::{compute_window, kind_for_days};

use super::normalize::{RowShape, normalize_row};
use super::{DAYS_RANGE, LIMIT_RANGE, OpenDataControl, TEXT_MAX_LEN, record_cap, scope_label};

const STATUS_OPTIONS: [&str; 6] = ["Open", "In Progress", "Pending", "Assigned", "Started", "Closed"];

const TOP_RANGE: RangeOptions = RangeOptions::new(1, 50, 10);

const SHAPE: RowShape = RowShape {
    timestamp: Some(sr311::CREATED_DATE),
    topic: Some(sr311::COMPLAINT_TYPE),
    borough: Some(sr311::BOROUGH),
    community_district: Some(sr311::COMMUNITY_BOARD),
    bbl: Some(sr311::BBL),
    lat: Some(sr311::LATITUDE),
    lon: Some(sr311::LONGITUDE),
};

/// Filters for a 311 service request search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintSearchRequest {
    pub borough: Option<String>,
    pub days: Option<f64>,
    /// Substring of the complaint type, case-insensitive.
    pub complaint_type: Option<String>,
    pub descriptor: Option<String>,
    pub status: Option<String>,
    pub limit: Option<f64>,
}

/// Filters for daily 311 complaint counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintTrendsRequest {
    pub borough: Option<String>,
    pub days: Option<f64>,
    pub complaint_type: Option<String>,
    /// How many leading complaint types to report.
    pub top: Option<f64>,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Searches 311 service requests, newest first, deduplicated by `unique_key`.
    pub async fn search_complaints(&self, request: ComplaintSearchRequest) -> Envelope {
        let result = self.try_search_complaints(request).await;
        self.respond("search_complaints", result)
    }

    /// Daily complaint counts with a week-over-week trend.
    ///
    /// Issues the daily rollup and the top-type rollup concurrently.
    pub async fn complaint_trends(&self, request: ComplaintTrendsRequest) -> Envelope {
        let result = self.try_complaint_trends(request).await;
        self.respond("complaint_trends", result)
    }

    async fn try_search_complaints(&self, request: ComplaintSearchRequest) -> CoreResult<Envelope> {
        let mut batch = ValidationBatch::new();
        let borough = batch.check("borough", validate_borough(request.borough.as_deref()));
        let days = batch.check("days", validate_int_range("days", request.days, DAYS_RANGE));
        let complaint_type = batch.check(
            "complaint_type",
            validate_text("complaint_type", request.complaint_type.as_deref(), TEXT_MAX_LEN),
        );
        let descriptor = batch.check(
            "descriptor",
            validate_text("descriptor", request.descriptor.as_deref(), TEXT_MAX_LEN),
        );
        let status = batch.check(
            "status",
            validate_enum("status", request.status.as_deref(), &STATUS_OPTIONS),
        );
        let limit = batch.check("limit", validate_int_range("limit", request.limit, LIMIT_RANGE));
        let filters = batch.finish()?;

        let borough = borough.flatten();
        let days = days.unwrap_or(DAYS_RANGE.default);
        let limit = limit.unwrap_or(LIMIT_RANGE.default);
        self.rate.check_caps(Some(days), Some(limit), false)?;
        let window = compute_window(kind_for_days(days), Some(days))?;

        let query = SoqlQuery::new()
            .and_where(soql::between(sr311::CREATED_DATE, window.start, window.end))
            .and_where_opt(borough.map(|borough| soql::eq_escaped(sr311::BOROUGH, borough.name())))
            .and_where_opt(
                complaint_type
                    .flatten()
                    .map(|text| soql::contains_escaped(sr311::COMPLAINT_TYPE, &text)),
            )
            .and_where_opt(
                descriptor
                    .flatten()
                    .map(|text| soql::contains_escaped(sr311::DESCRIPTOR, &text)),
            )
            .and_where_opt(
                status
                    .flatten()
                    .map(|status| soql::eq_escaped(sr311::STATUS, status)),
            )
            .order(format!("{} DESC, {} ASC", sr311::CREATED_DATE, sr311::UNIQUE_KEY));

        let fetched = self
            .fetch(&SERVICE_REQUESTS_311, &query, record_cap(limit), CacheTtl::Short)
            .await?;
        let outcome = deduplicate_rows(fetched.data, &[sr311::UNIQUE_KEY]);
        let stats = outcome.stats();

        let open = outcome
            .deduplicated
            .iter()
            .filter(|row| str_field(row, sr311::STATUS).is_some_and(|s| !s.eq_ignore_ascii_case("closed")))
            .count();
        let top_types = top_values(
            outcome
                .deduplicated
                .iter()
                .filter_map(|row| str_field(row, sr311::COMPLAINT_TYPE)),
            5,
        );

        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| normalize_row(&self.geo, &SHAPE, row, None, None))
            .collect();

        let mut insights = Insights::new(format!(
            "{} 311 service requests {} over the last {days} days",
            records.len(),
            scope_label(borough)
        ))
        .with_takeaway(format!("{open} of them are still open."));
        if let Some(top) = top_types.first() {
            insights = insights.with_takeaway(format!(
                "Most common complaint: {} ({} requests).",
                top.value, top.count
            ));
        }

        Ok(EnvelopeBuilder::new(&SERVICE_REQUESTS_311, EVENT_311_COMPLAINT)
            .window(window)
            .meta("filters", filters)
            .meta("cached", fetched.cached)
            .meta("deduplication", stats)
            .meta("topComplaintTypes", top_types)
            .insights(insights)
            .search(records))
    }

    async fn try_complaint_trends(&self, request: ComplaintTrendsRequest) -> CoreResult<Envelope> {
        let mut batch = ValidationBatch::new();
        let borough = batch.check("borough", validate_borough(request.borough.as_deref()));
        let days = batch.check("days", validate_int_range("days", request.days, DAYS_RANGE));
        let complaint_type = batch.check(
            "complaint_type",
            validate_text("complaint_type", request.complaint_type.as_deref(), TEXT_MAX_LEN),
        );
        let top = batch.check("top", validate_int_range("top", request.top, TOP_RANGE));
        let filters = batch.finish()?;

        let borough = borough.flatten();
        let days = days.unwrap_or(DAYS_RANGE.default);
        let top = top.unwrap_or(TOP_RANGE.default);
        let max_rows = self.rate.limits().max_aggregated_limit;
        self.rate.check_caps(Some(days), Some(max_rows), true)?;
        let window = compute_window(kind_for_days(days), Some(days))?;

        let filtered = SoqlQuery::new()
            .and_where(soql::between(sr311::CREATED_DATE, window.start, window.end))
            .and_where_opt(borough.map(|borough| soql::eq_escaped(sr311::BOROUGH, borough.name())))
            .and_where_opt(
                complaint_type
                    .flatten()
                    .map(|text| soql::contains_escaped(sr311::COMPLAINT_TYPE, &text)),
            );
        let day_expr = format!("date_trunc_ymd({})", sr311::CREATED_DATE);
        let daily = filtered
            .clone()
            .select(format!(
                "{day_expr} as period, {} as topic, count(*) as count",
                sr311::COMPLAINT_TYPE
            ))
            .group(format!("{day_expr}, {}", sr311::COMPLAINT_TYPE))
            .order(format!("{day_expr} ASC, {} ASC", sr311::COMPLAINT_TYPE));
        let leaders = filtered
            .select(format!("{} as topic, count(*) as count", sr311::COMPLAINT_TYPE))
            .group(sr311::COMPLAINT_TYPE)
            .order(format!("count DESC, {} ASC", sr311::COMPLAINT_TYPE));

        let (daily_rows, leader_rows) = futures::try_join!(
            self.fetch(&SERVICE_REQUESTS_311, &daily, record_cap(max_rows), CacheTtl::Default),
            self.fetch(&SERVICE_REQUESTS_311, &leaders, record_cap(top), CacheTtl::Default),
        )?;
        let cached = daily_rows.cached && leader_rows.cached;

        let rows: Vec<Row> = daily_rows
            .data
            .into_iter()
            .map(|mut row| {
                if let Some(day) = day_field(&row, "period") {
                    row.insert("period".to_string(), Value::from(day));
                }
                row
            })
            .collect();
        let outcome = deduplicate_aggregated(rows, &["period", "topic"], "count");
        let stats = outcome.stats();

        let series = daily_series(&outcome.deduplicated, &window);
        let trend = compute_trend(&series);
        let top_types: Vec<ValueCount> = leader_rows
            .data
            .iter()
            .filter_map(|row| {
                Some(ValueCount {
                    value: text_field(row, "topic")?,
                    count: u64_field(row, "count").unwrap_or(0),
                })
            })
            .collect();

        let area = self.geo.enrich(&GeoInput {
            borough: borough.map(|borough| borough.name()),
            ..GeoInput::default()
        });
        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| rollup_record(row, &area))
            .collect();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total: u64 = records
            .iter()
            .filter_map(|record| record.value)
            .map(|value| value as u64)
            .sum();
        let mut insights = Insights::new(format!(
            "{total} 311 complaints {} over the last {days} days",
            scope_label(borough)
        ))
        .with_takeaway(trend_takeaway(&trend));
        if let Some(leader) = top_types.first() {
            insights = insights.with_takeaway(format!(
                "Leading complaint type: {} ({} complaints).",
                leader.value, leader.count
            ));
        }

        Ok(EnvelopeBuilder::new(&SERVICE_REQUESTS_311, EVENT_311_TREND)
            .window(window)
            .meta("filters", filters)
            .meta("cached", cached)
            .meta("deduplication", stats)
            .meta("trend", trend)
            .meta("topComplaintTypes", top_types)
            .insights(insights)
            .aggregate(records))
    }
}

/// One point per complete calendar day of the window, zero-filled, topics
/// summed. The window's last day is still in progress, so it is left out.
fn daily_series(rows: &[Row], window: &QueryWindow) -> Vec<PeriodCount> {
    let Some(last_day) = window.end.date().pred_opt() else {
        return Vec::new();
    };
    let cutoff = last_day.format("%Y-%m-%d").to_string();
    let mut series: Vec<PeriodCount> = rows
        .iter()
        .filter_map(|row| {
            let period = str_field(row, "period")?;
            (period <= cutoff.as_str()).then(|| PeriodCount {
                period: period.to_string(),
                topic: text_field(row, "topic"),
                count: u64_field(row, "count").unwrap_or(0),
            })
        })
        .collect();

    let mut day = window.start.date();
    while day <= last_day {
        series.push(PeriodCount {
            period: day.format("%Y-%m-%d").to_string(),
            topic: None,
            count: 0,
        });
        let Some(next) = day.checked_add_days(Days::new(1)) else {
            break;
        };
        day = next;
    }
    series
}

fn rollup_record(row: Row, area: &GeoInfo) -> NormalizedRecord {
    let period = str_field(&row, "period").map(str::to_string);
    #[allow(clippy::cast_precision_loss)]
    let value = u64_field(&row, "count").map(|count| count as f64);
    NormalizedRecord {
        timestamp: period.as_deref().and_then(parse_timestamp),
        period,
        geo: area.clone(),
        topic: text_field(&row, "topic"),
        value,
        details: row,
    }
}

fn trend_takeaway(trend: &Trend) -> String {
    match trend {
        Trend::Unavailable => "Not enough daily history for a week-over-week trend.".to_string(),
        Trend::Available {
            recent_average,
            previous_average,
            percent_change,
            direction,
        } => format!(
            "Daily volume is {} ({percent_change:+.2}%): {recent_average:.2}/day over the last 7 complete days versus {previous_average:.2}/day the week before (today is excluded).",
            direction.as_str()
        ),
    }
}
