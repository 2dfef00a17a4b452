use nycdata_model::schema::fields::pluto;
use nycdata_model::schema::{EVENT_BUILDING_PROFILE, PLUTO};
use nycdata_model::{Envelope, Insights, NormalizedRecord, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::CacheTtl;
use crate::dedup::deduplicate_rows;
use crate::envelope::EnvelopeBuilder;
use crate::error::{CoreError, CoreResult};
use crate::fields::{f64_field, str_field, u64_field};
use crate::soql::SoqlQuery;
use crate::source::RowSource;
use crate::validate::validate_bbl;

use super::OpenDataControl;
use super::normalize::{RowShape, normalize_row};

const SHAPE: RowShape = RowShape {
    timestamp: None,
    topic: Some(pluto::BUILDING_CLASS),
    borough: Some(pluto::BOROUGH),
    community_district: Some(pluto::CD),
    bbl: Some(pluto::BBL),
    lat: Some(pluto::LATITUDE),
    lon: Some(pluto::LONGITUDE),
};

/// Tax lot lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingProfileRequest {
    /// Ten-digit Borough-Block-Lot identifier.
    pub bbl: Option<String>,
}

impl<S: RowSource> OpenDataControl<S> {
    /// Looks up a tax lot in PLUTO. Lot data changes rarely, so results use
    /// the long cache tier.
    pub async fn building_profile(&self, request: BuildingProfileRequest) -> Envelope {
        let result = self.try_building_profile(request).await;
        self.respond("building_profile", result)
    }

    async fn try_building_profile(&self, request: BuildingProfileRequest) -> CoreResult<Envelope> {
        let bbl = validate_bbl(request.bbl.as_deref()).map_err(CoreError::from)?;

        // PLUTO stores BBL as a number.
        let query = SoqlQuery::new().and_where(format!("{} = {bbl}", pluto::BBL));
        let fetched = self.fetch(&PLUTO, &query, 1, CacheTtl::Long).await?;
        let outcome = deduplicate_rows(fetched.data, &[pluto::BBL]);
        let stats = outcome.stats();

        let insights = outcome
            .deduplicated
            .first()
            .map_or_else(|| no_lot_insights(&bbl.to_string()), lot_insights);

        let records: Vec<NormalizedRecord> = outcome
            .deduplicated
            .into_iter()
            .map(|row| {
                let value = f64_field(&row, pluto::ASSESSED_TOTAL);
                normalize_row(&self.geo, &SHAPE, row, Some(bbl), value)
            })
            .collect();

        Ok(EnvelopeBuilder::new(&PLUTO, EVENT_BUILDING_PROFILE)
            .meta("filters", json!({ "bbl": bbl.to_string() }))
            .meta("cached", fetched.cached)
            .meta("deduplication", stats)
            .insights(insights)
            .search(records))
    }
}

fn no_lot_insights(bbl: &str) -> Insights {
    Insights::new(format!("No PLUTO tax lot found for BBL {bbl}"))
        .with_takeaway("Check the BBL; condominium units are filed under their billing lot.")
}

fn lot_insights(row: &Row) -> Insights {
    let address = str_field(row, pluto::ADDRESS).unwrap_or("Unknown address");
    let mut insights = Insights::new(format!("Tax lot at {address}"));
    if let Some(year) = u64_field(row, pluto::YEAR_BUILT).filter(|year| *year > 0) {
        insights = insights.with_takeaway(format!("Built in {year}."));
    }
    match (
        u64_field(row, pluto::NUM_FLOORS).or_else(|| f64_field(row, pluto::NUM_FLOORS).map(floor)),
        u64_field(row, pluto::UNITS_RES),
    ) {
        (Some(floors), Some(units)) => {
            insights = insights.with_takeaway(format!("{floors} floors with {units} residential units."));
        }
        (Some(floors), None) => {
            insights = insights.with_takeaway(format!("{floors} floors."));
        }
        _ => {}
    }
    if let Some(class) = str_field(row, pluto::BUILDING_CLASS) {
        insights = insights.with_takeaway(format!("Building class {class}."));
    }
    insights
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor(value: f64) -> u64 {
    value.max(0.0).floor() as u64
}
