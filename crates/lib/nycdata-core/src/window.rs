//! Inclusive calendar windows for time-bounded queries.
//!
//! A window always starts at 00:00:00.000 and ends at 23:59:59.999 of the
//! current calendar day, so an N-day window spans N or N+1 days of elapsed
//! time. Callers compare against that range instead of an exact duration.

use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use nycdata_model::{QueryWindow, WindowKind};

use crate::error::{CoreError, InvalidInput};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Fixed span for a window kind, or `None` for custom windows.
#[must_use]
pub const fn fixed_days(kind: WindowKind) -> Option<i64> {
    match kind {
        WindowKind::Last90Days => Some(90),
        WindowKind::Last12Months => Some(365),
        WindowKind::Custom => None,
    }
}

/// Picks the named kind when a day count matches one, otherwise custom.
#[must_use]
pub const fn kind_for_days(days: i64) -> WindowKind {
    match days {
        90 => WindowKind::Last90Days,
        365 => WindowKind::Last12Months,
        _ => WindowKind::Custom,
    }
}

/// Computes a window ending today in local time.
///
/// # Errors
/// Returns `CoreError::InvalidInput` when a custom window has no positive day count.
pub fn compute_window(kind: WindowKind, explicit_days: Option<i64>) -> Result<QueryWindow, CoreError> {
    compute_window_at(kind, explicit_days, Local::now().naive_local())
}

/// Computes a window ending on the calendar day of `now`.
///
/// # Errors
/// Returns `CoreError::InvalidInput` when a custom window has no positive day count,
/// or when the start would fall outside the supported calendar.
pub fn compute_window_at(
    kind: WindowKind,
    explicit_days: Option<i64>,
    now: NaiveDateTime,
) -> Result<QueryWindow, CoreError> {
    let span = match fixed_days(kind) {
        Some(days) => days,
        None => match explicit_days {
            Some(days) if days > 0 => days,
            Some(days) => {
                return Err(invalid_days(format!(
                    "custom window needs a positive number of days, got {days}"
                )));
            }
            None => {
                return Err(invalid_days(
                    "custom window needs a positive number of days".to_string(),
                ));
            }
        },
    };

    let today = now.date();
    let first_day = u64::try_from(span)
        .ok()
        .and_then(|span| today.checked_sub_days(Days::new(span)))
        .ok_or_else(|| invalid_days(format!("{span} days reaches before the supported calendar")))?;

    let start = first_day.and_time(NaiveTime::MIN);
    let end = end_of_day(today);
    let elapsed = (end - start).num_milliseconds();
    let days = (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;

    Ok(QueryWindow {
        start,
        end,
        days,
        kind,
    })
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN))
}

fn invalid_days(message: String) -> CoreError {
    InvalidInput::new("days", message, "Pass days as a whole number of at least 1.").into()
}

/// Formats a timestamp as a SoQL floating timestamp literal.
#[must_use]
pub fn soql_timestamp(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}
