use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw row as returned by the Socrata JSON endpoint.
pub type Row = Map<String, Value>;

/// The five boroughs, numbered by their city borough code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Borough {
    #[serde(rename = "MANHATTAN")]
    Manhattan,
    #[serde(rename = "BRONX")]
    Bronx,
    #[serde(rename = "BROOKLYN")]
    Brooklyn,
    #[serde(rename = "QUEENS")]
    Queens,
    #[serde(rename = "STATEN ISLAND")]
    StatenIsland,
}

impl Borough {
    pub const ALL: [Self; 5] = [
        Self::Manhattan,
        Self::Bronx,
        Self::Brooklyn,
        Self::Queens,
        Self::StatenIsland,
    ];

    /// Numeric borough code (1 = Manhattan .. 5 = Staten Island).
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Manhattan => 1,
            Self::Bronx => 2,
            Self::Brooklyn => 3,
            Self::Queens => 4,
            Self::StatenIsland => 5,
        }
    }

    /// Canonical uppercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Manhattan => "MANHATTAN",
            Self::Bronx => "BRONX",
            Self::Brooklyn => "BROOKLYN",
            Self::Queens => "QUEENS",
            Self::StatenIsland => "STATEN ISLAND",
        }
    }

    /// Two-letter abbreviation used by DCP and PLUTO.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Manhattan => "MN",
            Self::Bronx => "BX",
            Self::Brooklyn => "BK",
            Self::Queens => "QN",
            Self::StatenIsland => "SI",
        }
    }

    /// Single-letter code used by DOT street datasets.
    #[must_use]
    pub const fn dot_code(self) -> &'static str {
        match self {
            Self::Manhattan => "M",
            Self::Bronx => "X",
            Self::Brooklyn => "B",
            Self::Queens => "Q",
            Self::StatenIsland => "S",
        }
    }

    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Manhattan),
            2 => Some(Self::Bronx),
            3 => Some(Self::Brooklyn),
            4 => Some(Self::Queens),
            5 => Some(Self::StatenIsland),
            _ => None,
        }
    }

    /// Parses a borough from a full name, short code, or numeric code.
    ///
    /// Matching is case-insensitive. Accepted forms include `"Staten Island"`,
    /// `"staten_island"`, `"The Bronx"`, `"BX"`, `"K"`, and `"3"`.
    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase().replace(['_', '-'], " ");
        let normalized = upper.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = normalized.strip_prefix("THE ").unwrap_or(&normalized);
        match normalized {
            "MANHATTAN" | "NEW YORK" | "MN" | "M" | "1" => Some(Self::Manhattan),
            "BRONX" | "BX" | "X" | "2" => Some(Self::Bronx),
            "BROOKLYN" | "KINGS" | "BK" | "K" | "B" | "3" => Some(Self::Brooklyn),
            "QUEENS" | "QN" | "Q" | "4" => Some(Self::Queens),
            "STATEN ISLAND" | "RICHMOND" | "SI" | "R" | "S" | "5" => Some(Self::StatenIsland),
            _ => None,
        }
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Best-effort geography attached to every normalized record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    pub borough: Option<Borough>,
    pub borough_id: Option<u8>,
    pub community_district: Option<String>,
    pub nta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nta_name: Option<String>,
    pub bbl: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Canonical per-entity shape produced from one raw dataset row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub period: Option<String>,
    pub geo: GeoInfo,
    pub topic: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub details: Row,
}

/// Kind of query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowKind {
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "12m")]
    Last12Months,
    #[serde(rename = "custom")]
    Custom,
}

/// Inclusive time window a query was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub days: i64,
    pub kind: WindowKind,
}

/// One bucket of an aggregated period series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub count: u64,
}

/// Short human-readable summary attached to a success envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub headline: String,
    pub takeaways: Vec<String>,
}

impl Insights {
    #[must_use]
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            takeaways: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_takeaway(mut self, takeaway: impl Into<String>) -> Self {
        self.takeaways.push(takeaway.into());
        self
    }
}

/// Success payload shared by every tool operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    pub success: bool,
    pub source: String,
    pub event_type: String,
    pub window: Option<QueryWindow>,
    pub count: u64,
    pub records: Vec<NormalizedRecord>,
    pub meta: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

/// Structured failure description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub details: Value,
    pub guidance: String,
}

/// Failure payload shared by every tool operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

/// Uniform response wrapper returned by every tool operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Success(SuccessEnvelope),
    Failure(ErrorEnvelope),
}

impl Envelope {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn as_success(&self) -> Option<&SuccessEnvelope> {
        match self {
            Self::Success(envelope) => Some(envelope),
            Self::Failure(_) => None,
        }
    }

    #[must_use]
    pub const fn as_failure(&self) -> Option<&ErrorBody> {
        match self {
            Self::Success(_) => None,
            Self::Failure(envelope) => Some(&envelope.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borough_codes_resolve_to_canonical_names() {
        assert_eq!(Borough::from_code("bx"), Some(Borough::Bronx));
        assert_eq!(Borough::from_code(" staten_island "), Some(Borough::StatenIsland));
        assert_eq!(Borough::from_code("The Bronx"), Some(Borough::Bronx));
        assert_eq!(Borough::from_code("3"), Some(Borough::Brooklyn));
        assert_eq!(Borough::from_code("k"), Some(Borough::Brooklyn));
        assert_eq!(Borough::from_code("New Jersey"), None);
        assert_eq!(Borough::from_code("6"), None);
    }

    #[test]
    fn borough_serializes_as_uppercase_name() {
        let json = serde_json::to_string(&Borough::StatenIsland).expect("serialize borough");
        assert_eq!(json, "\"STATEN ISLAND\"");
    }

    #[test]
    fn failure_envelope_roundtrips_through_untagged_enum() {
        let envelope = Envelope::Failure(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                kind: "INVALID_INPUT".to_string(),
                message: "bad borough".to_string(),
                details: Value::Null,
                guidance: "use a borough name".to_string(),
            },
        });
        let json = serde_json::to_value(&envelope).expect("serialize envelope");
        assert_eq!(json["error"]["type"], "INVALID_INPUT");
        let parsed: Envelope = serde_json::from_value(json).expect("deserialize envelope");
        assert!(!parsed.is_success());
    }
}
