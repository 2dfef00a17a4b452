use std::collections::HashMap;
use std::sync::LazyLock;

/// One row of the community district to neighborhood table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtaEntry {
    pub code: String,
    pub name: String,
}

static CD_NTA: LazyLock<HashMap<u16, NtaEntry>> =
    LazyLock::new(|| parse_table(include_str!("../../data/cd_nta.csv")));

fn parse_table(raw: &str) -> HashMap<u16, NtaEntry> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.splitn(3, ',');
            let district = parts.next()?.trim().parse().ok()?;
            let code = parts.next()?.trim().to_string();
            let name = parts.next()?.trim().to_string();
            Some((district, NtaEntry { code, name }))
        })
        .collect()
}

/// Representative neighborhood for a three-digit community district code.
///
/// Each district maps to a single NTA. Districts covering several
/// neighborhoods report the most populous one.
#[must_use]
pub fn nta_for_district(district: u16) -> Option<&'static NtaEntry> {
    CD_NTA.get(&district)
}

#[must_use]
pub fn is_known_district(district: u16) -> bool {
    CD_NTA.contains_key(&district)
}

#[must_use]
pub fn district_count() -> usize {
    CD_NTA.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_community_district() {
        assert_eq!(district_count(), 59);
        assert_eq!(nta_for_district(105).map(|nta| nta.code.as_str()), Some("MN17"));
        assert_eq!(
            nta_for_district(503).map(|nta| nta.name.as_str()),
            Some("Annadale-Huguenot-Prince's Bay-Eltingville")
        );
        assert!(nta_for_district(164).is_none());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = parse_table("# header\n101,MN24,SoHo\nnot-a-row\n,,\n");
        assert_eq!(table.len(), 1);
    }
}
