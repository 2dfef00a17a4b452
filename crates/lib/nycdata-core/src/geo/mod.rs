//! Geographic enrichment for raw dataset rows.
//!
//! Maps borough names or codes and community district strings onto borough
//! ids, three-digit community district codes, and a representative
//! neighborhood (NTA). Anything that cannot be derived stays `None`.

mod bbl;
mod table;

use std::collections::HashMap;
use std::sync::Mutex;

use nycdata_model::{Borough, GeoInfo};

pub use bbl::Bbl;
pub use table::{NtaEntry, district_count, is_known_district, nta_for_district};

/// Raw geographic fields pulled from one row.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoInput<'a> {
    pub borough: Option<&'a str>,
    pub community_district: Option<&'a str>,
    pub bbl: Option<Bbl>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Area {
    borough: Option<Borough>,
    community_district: Option<u16>,
    nta: Option<&'static NtaEntry>,
}

/// Memoizing enricher.
///
/// Derived areas are cached for the life of the process. Keys are built only
/// from the fields the area is derived from (borough, district, BBL borough),
/// so the key space stays small and there is no eviction. Coordinates pass
/// through untouched.
#[derive(Debug, Default)]
pub struct GeoEnricher {
    memo: Mutex<HashMap<String, Area>>,
}

impl GeoEnricher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enrich(&self, input: &GeoInput<'_>) -> GeoInfo {
        let key = memo_key(input);
        let area = self.lookup(&key).unwrap_or_else(|| {
            let area = resolve_area(input);
            self.remember(key, area);
            area
        });

        GeoInfo {
            borough: area.borough,
            borough_id: area.borough.map(Borough::id),
            community_district: area.community_district.map(|code| code.to_string()),
            nta: area.nta.map(|nta| nta.code.clone()),
            nta_name: area.nta.map(|nta| nta.name.clone()),
            bbl: input.bbl.map(|bbl| bbl.to_string()),
            lat: input.lat,
            lon: input.lon,
        }
    }

    /// Number of memoized keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.lock().map_or(0, |memo| memo.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<Area> {
        // A poisoned memo only costs a recomputation.
        self.memo.lock().ok()?.get(key).copied()
    }

    fn remember(&self, key: String, area: Area) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, area);
        }
    }
}

fn memo_key(input: &GeoInput<'_>) -> String {
    format!(
        "{}|{}|{}",
        input.borough.unwrap_or_default().trim().to_uppercase(),
        input.community_district.unwrap_or_default().trim().to_uppercase(),
        input.bbl.map_or(0, |bbl| bbl.borough.id()),
    )
}

fn resolve_area(input: &GeoInput<'_>) -> Area {
    let named = input
        .borough
        .and_then(Borough::from_code)
        .or_else(|| input.bbl.map(|bbl| bbl.borough));
    let community_district = input
        .community_district
        .and_then(|raw| parse_community_district(raw, named));
    let borough = named.or_else(|| {
        community_district.and_then(|code| u8::try_from(code / 100).ok().and_then(Borough::from_id))
    });

    Area {
        borough,
        community_district,
        nta: community_district.and_then(nta_for_district),
    }
}

/// Parses a community district into its three-digit code.
///
/// Accepts `"112"`, `"12 MANHATTAN"`, `"MN12"`, and `"12"` when the borough
/// is known from another field. Unknown districts such as `"0 Unspecified"`
/// or joint-interest areas yield `None`.
#[must_use]
pub fn parse_community_district(raw: &str, borough: Option<Borough>) -> Option<u16> {
    let first = raw.split(',').next()?.trim().to_uppercase();
    if first.is_empty() {
        return None;
    }

    let digits_at = first.find(|c: char| c.is_ascii_digit())?;
    let digits: String = first[digits_at..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let number: u16 = digits.parse().ok()?;
    let prefix = first[..digits_at].trim();
    let suffix = first[digits_at + digits.len()..].trim();

    let code = if digits.len() == 3 {
        number
    } else if number < 100 {
        let named = if prefix.is_empty() { suffix } else { prefix };
        let district_borough = if named.is_empty() {
            borough?
        } else {
            Borough::from_code(named).or(borough)?
        };
        u16::from(district_borough.id()) * 100 + number
    } else {
        return None;
    };

    is_known_district(code).then_some(code)
}
