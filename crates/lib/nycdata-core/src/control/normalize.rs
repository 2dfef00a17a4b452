//! Row to `NormalizedRecord` mapping shared by the dataset operations.

use nycdata_model::{NormalizedRecord, Row};

use crate::fields::{f64_field, str_field, text_field, timestamp_field};
use crate::geo::{Bbl, GeoEnricher, GeoInput};

/// Which columns of a dataset carry the normalized fields.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RowShape {
    pub timestamp: Option<&'static str>,
    pub topic: Option<&'static str>,
    pub borough: Option<&'static str>,
    pub community_district: Option<&'static str>,
    pub bbl: Option<&'static str>,
    pub lat: Option<&'static str>,
    pub lon: Option<&'static str>,
}

/// Maps one row, moving it into `details`.
///
/// `bbl_override` wins over the shape's BBL column for datasets that carry
/// the parts separately.
pub(crate) fn normalize_row(
    geo: &GeoEnricher,
    shape: &RowShape,
    row: Row,
    bbl_override: Option<Bbl>,
    value: Option<f64>,
) -> NormalizedRecord {
    let timestamp = shape.timestamp.and_then(|field| timestamp_field(&row, field));
    let bbl = bbl_override.or_else(|| {
        shape
            .bbl
            .and_then(|field| text_field(&row, field))
            .and_then(|raw| Bbl::parse(&raw))
    });
    let community_district = shape
        .community_district
        .and_then(|field| text_field(&row, field));

    let geo = geo.enrich(&GeoInput {
        borough: shape.borough.and_then(|field| str_field(&row, field)),
        community_district: community_district.as_deref(),
        bbl,
        lat: shape.lat.and_then(|field| f64_field(&row, field)),
        lon: shape.lon.and_then(|field| f64_field(&row, field)),
    });

    NormalizedRecord {
        timestamp,
        period: timestamp.map(|ts| ts.date().format("%Y-%m-%d").to_string()),
        geo,
        topic: shape.topic.and_then(|field| text_field(&row, field)),
        value,
        details: row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nycdata_model::Borough;
    use serde_json::{Value, json};

    #[test]
    fn maps_columns_and_keeps_details() {
        let Value::Object(row) = json!({
            "created_date": "2025-03-01T10:15:00.000",
            "complaint_type": "Noise - Residential",
            "borough": "BROOKLYN",
            "community_board": "01 BROOKLYN",
            "bbl": "3023450012",
            "latitude": "40.7178",
            "longitude": "-73.9573",
        }) else {
            unreachable!()
        };
        let shape = RowShape {
            timestamp: Some("created_date"),
            topic: Some("complaint_type"),
            borough: Some("borough"),
            community_district: Some("community_board"),
            bbl: Some("bbl"),
            lat: Some("latitude"),
            lon: Some("longitude"),
        };
        let record = normalize_row(&GeoEnricher::new(), &shape, row, None, None);
        assert_eq!(record.period.as_deref(), Some("2025-03-01"));
        assert_eq!(record.topic.as_deref(), Some("Noise - Residential"));
        assert_eq!(record.geo.borough, Some(Borough::Brooklyn));
        assert_eq!(record.geo.community_district.as_deref(), Some("301"));
        assert_eq!(record.geo.bbl.as_deref(), Some("3023450012"));
        assert_eq!(record.geo.lat, Some(40.7178));
        assert_eq!(record.details["complaint_type"], "Noise - Residential");
    }

    #[test]
    fn missing_columns_degrade() {
        let record = normalize_row(
            &GeoEnricher::new(),
            &RowShape::default(),
            Row::new(),
            None,
            Some(3.0),
        );
        assert!(record.timestamp.is_none());
        assert!(record.geo.borough.is_none());
        assert_eq!(record.value, Some(3.0));
    }
}
