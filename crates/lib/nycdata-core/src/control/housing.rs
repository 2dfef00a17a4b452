use nycdata_model::schema::fields::hpd;
use nycdata_model::schema::{EVENT_HPD_VIOLATION, HPD_VIOLATION_CLASSES, HPD_VIOLATIONS};
use nycdata_model::{Envelope, Insights, NormalizedRecord};
use serde::{Deserialize, Serialize};

use crate::config::CacheTtl;
use crate::dedup::deduplicate_rows;
use crate::envelope::EnvelopeBuilder;
use crate::error::CoreResult;
use crate::fields::{str_field, text_field};
use crate::geo::Bbl;
use crate::metrics::severity_mix;
use crate::soql::{self, SoqlQuery};
use crate::source::RowSource;
use crate::validate::{
    ValidationBatch, validate_borough, validate_enum, validate_int_range, validate_text,
};
use crate::window::{compute_window, kind_for_days};

use super::normalize::{RowShape, normalize_row};
use super::{DAYS_RANGE, LIMIT_RANGE, OpenDataControl, TEXT_MAX_LEN, record_cap, scope_label};

const STATUS_OPTIONS: [&str; 2] = ["Open", "Close"];

const SHAPE: RowShape = RowShape {
    timestamp: Some(hpd::INSPECTION_DATE),
    topic: Some(hpd::CLASS),
    borough: Some(hpd::BORO),
    community_district: Some(hpd::COMMUNITY_BOARD),
    bbl: Some(hpd::BBL),
    lat: Some(hpd::LATITUDE),
    lon: Some(hpd::LONGITUDE),
};

/// Filters for an HPD housing maintenance code violation search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HousingViolationsRequest {
    pub borough: Option<String>,
    pub days: Option<f64>,
    /// Violation class: A (non-hazardous), B (hazardous), C (immediately
    /// hazardous), or I (information orders).
    pub violation_class: Option<String>,
    /// `Open` or `Close`.
    pub status: Option<String>,
    /// Substring of the street name.
    pub street: Option<String>,
    pub limit: Option<f64>,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Searches HPD violations, deduplicated by `violationid`, with a severity
    /// mix computed over the deduplicated set.
    pub async fn housing_violations(&self, request: HousingViolationsRequest) -> Envelope {
        let result = self.try_housing_violations(request).await;
        self.respond("housing_violations", result)
    }

    async fn try_housing_violations(&self, request: HousingViolationsRequest) -> CoreResult<Envelope> {
        let mut batch = ValidationBatch::new();
        let borough = batch.check("borough", validate_borough(request.borough.as_deref()));
        let days = batch.check("days", validate_int_range("days", request.days, DAYS_RANGE));
        let class = batch.check(
            "violation_class",
            validate_enum(
                "violation_class",
                request.violation_class.as_deref(),
                &HPD_VIOLATION_CLASSES,
            ),
        );
        let status = batch.check(
            "status",
            validate_enum("status", request.status.as_deref(), &STATUS_OPTIONS),
        );
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
            .and_where(soql::between(hpd::INSPECTION_DATE, window.start, window.end))
            .and_where_opt(borough.map(|borough| soql::eq_escaped(hpd::BORO, borough.name())))
            .and_where_opt(class.flatten().map(|class| soql::eq_escaped(hpd::CLASS, class)))
            .and_where_opt(
                status
                    .flatten()
                    .map(|status| soql::eq_escaped(hpd::STATUS, &status.to_uppercase())),
            )
            .and_where_opt(
                street
                    .flatten()
                    .map(|text| soql::contains_escaped(hpd::STREET_NAME, &text)),
            )
            .order(format!("{} DESC, {} ASC", hpd::INSPECTION_DATE, hpd::VIOLATION_ID));

        let fetched = self
            .fetch(&HPD_VIOLATIONS, &query, record_cap(limit), CacheTtl::Default)
            .await?;
        let outcome = deduplicate_rows(fetched.data, &[hpd::VIOLATION_ID]);
        let stats = outcome.stats();
        let mix = severity_mix(
            outcome
                .deduplicated
                .iter()
                .map(|row| str_field(row, hpd::CLASS)),
        );
        let open = outcome
            .deduplicated
            .iter()
            .filter(|row| str_field(row, hpd::STATUS).is_some_and(|s| s.eq_ignore_ascii_case("open")))
            .count();

        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| {
                let bbl = lot_from_parts(&row);
                normalize_row(&self.geo, &SHAPE, row, bbl, None)
            })
            .collect();

        let mut insights = Insights::new(format!(
            "{} HPD violations {} over the last {days} days",
            records.len(),
            scope_label(borough)
        ))
        .with_takeaway(format!("{open} are still open."));
        if mix.total > 0 {
            insights = insights.with_takeaway(format!(
                "{}% are class C (immediately hazardous) and {}% class B (hazardous).",
                mix.percentages.get("C").copied().unwrap_or_default(),
                mix.percentages.get("B").copied().unwrap_or_default(),
            ));
        }
        if let Some(index) = mix.hazard_index {
            insights = insights.with_takeaway(format!(
                "Hazard index {index:.2} on a scale of 1 (class A) to 3 (class C)."
            ));
        }

        Ok(EnvelopeBuilder::new(&HPD_VIOLATIONS, EVENT_HPD_VIOLATION)
            .window(window)
            .meta("filters", filters)
            .meta("cached", fetched.cached)
            .meta("deduplication", stats)
            .meta("severity", mix)
            .insights(insights)
            .search(records))
    }
}

/// BBL from the separate borough id, block, and lot columns.
fn lot_from_parts(row: &nycdata_model::Row) -> Option<Bbl> {
    Bbl::from_parts(
        &text_field(row, hpd::BORO_ID)?,
        &text_field(row, hpd::BLOCK)?,
        &text_field(row, hpd::LOT)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn builds_bbl_from_parts() {
        let Value::Object(row) = json!({"boroid": "2", "block": "2345", "lot": "12"}) else {
            unreachable!()
        };
        assert_eq!(lot_from_parts(&row).map(|bbl| bbl.to_string()).as_deref(), Some("2023450012"));
        assert!(lot_from_parts(&nycdata_model::Row::new()).is_none());
    }
}
