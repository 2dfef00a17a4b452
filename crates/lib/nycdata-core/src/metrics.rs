//! Derived metrics computed from deduplicated records only.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use nycdata_model::schema::HPD_VIOLATION_CLASSES;
use serde::Serialize;

use crate::trend::round2;

/// One value and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// Most frequent values, ties broken alphabetically.
#[must_use]
pub fn top_values<'a, I>(values: I, n: usize) -> Vec<ValueCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut ranked: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked.truncate(n);
    ranked
}

/// Active versus finished closures on a given day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureActivity {
    pub active: u64,
    pub inactive: u64,
    pub upcoming: u64,
    /// Mean length in days of closures with both dates set.
    pub average_duration_days: Option<f64>,
}

/// A closure is active when it has started and its end, if any, has not passed.
#[must_use]
pub fn closure_activity<I>(spans: I, now: NaiveDateTime) -> ClosureActivity
where
    I: IntoIterator<Item = (Option<NaiveDateTime>, Option<NaiveDateTime>)>,
{
    let mut activity = ClosureActivity::default();
    let mut duration_total = 0.0;
    let mut duration_count = 0_u32;

    for (start, end) in spans {
        match (start, end) {
            (Some(start), _) if start > now => activity.upcoming += 1,
            (_, Some(end)) if end < now => activity.inactive += 1,
            _ => activity.active += 1,
        }
        if let (Some(start), Some(end)) = (start, end)
            && end >= start
        {
            #[allow(clippy::cast_precision_loss)]
            let minutes = (end - start).num_minutes() as f64;
            duration_total += minutes / (24.0 * 60.0);
            duration_count += 1;
        }
    }

    if duration_count > 0 {
        activity.average_duration_days = Some(round2(duration_total / f64::from(duration_count)));
    }
    activity
}

/// Class breakdown of HPD violations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityMix {
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
    /// Share of the total per class, in percent.
    pub percentages: BTreeMap<String, f64>,
    /// Mean severity of classed violations on a 1 (A) to 3 (C) scale.
    pub hazard_index: Option<f64>,
}

/// Class weight in the hazard index. Class I orders are not scored.
const fn class_weight(class: &str) -> Option<u32> {
    match class.as_bytes() {
        b"A" => Some(1),
        b"B" => Some(2),
        b"C" => Some(3),
        _ => None,
    }
}

/// Tallies violation classes. Unknown or missing classes count toward the
/// total but not toward any class.
#[must_use]
pub fn severity_mix<'a, I>(classes: I) -> SeverityMix
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<String, u64> = HPD_VIOLATION_CLASSES
        .iter()
        .map(|class| ((*class).to_string(), 0))
        .collect();
    let mut total = 0_u64;
    let mut weighted = 0_u64;
    let mut scored = 0_u64;

    for class in classes {
        total += 1;
        let Some(class) = class.map(|raw| raw.trim().to_uppercase()) else {
            continue;
        };
        if let Some(count) = counts.get_mut(&class) {
            *count += 1;
        }
        if let Some(weight) = class_weight(&class) {
            weighted += u64::from(weight);
            scored += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let percentages = counts
        .iter()
        .map(|(class, count)| {
            let share = if total == 0 {
                0.0
            } else {
                round2(*count as f64 / total as f64 * 100.0)
            };
            (class.clone(), share)
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let hazard_index = (scored > 0).then(|| round2(weighted as f64 / scored as f64));

    SeverityMix {
        total,
        counts,
        percentages,
        hazard_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::parse_timestamp;

    fn ts(raw: &str) -> Option<NaiveDateTime> {
        parse_timestamp(raw)
    }

    #[test]
    fn top_values_rank_by_count_then_name() {
        let top = top_values(["Noise", "Heat", "Noise", "Rodent", "Heat", "Noise"], 2);
        assert_eq!(
            top,
            vec![
                ValueCount {
                    value: "Noise".to_string(),
                    count: 3
                },
                ValueCount {
                    value: "Heat".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn classifies_closures_against_now() {
        let now = ts("2025-01-05").expect("now");
        let activity = closure_activity(
            [
                (ts("2025-01-01"), ts("2025-01-10")),
                (ts("2024-12-01"), ts("2024-12-31")),
                (ts("2025-02-01"), ts("2025-02-03")),
                (ts("2025-01-02"), None),
            ],
            now,
        );
        assert_eq!(activity.active, 2);
        assert_eq!(activity.inactive, 1);
        assert_eq!(activity.upcoming, 1);
        assert_eq!(activity.average_duration_days, Some(13.67));
    }

    #[test]
    fn severity_percentages_and_hazard() {
        let mix = severity_mix([Some("A"), Some("b"), Some("C"), Some("C"), Some("I"), None]);
        assert_eq!(mix.total, 6);
        assert_eq!(mix.counts["C"], 2);
        assert_eq!(mix.counts["B"], 1);
        assert_eq!(mix.percentages["C"], 33.33);
        assert_eq!(mix.percentages["I"], 16.67);
        assert_eq!(mix.hazard_index, Some(2.25));
    }

    #[test]
    fn empty_mix_has_no_hazard_index() {
        let mix = severity_mix(std::iter::empty());
        assert_eq!(mix.total, 0);
        assert_eq!(mix.hazard_index, None);
        assert_eq!(mix.percentages["A"], 0.0);
    }
}
