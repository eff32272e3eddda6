//! Overlap arithmetic for the schedule grid.
//!
//! Two comparators live here and nowhere else:
//!
//! - [`times_overlap`] compares `[start, end)` minute-of-day intervals.
//!   Half-open semantics: a slot ending 10:00 and one starting 10:00 do
//!   not conflict.
//! - [`periods_overlap`] compares `[from, until]` calendar ranges with
//!   inclusive endpoints, scoping conflict checks to entries whose
//!   validity windows actually coexist.
//!
//! Both conflict detection and availability search go through these
//! functions; duplicating the predicates with divergent semantics is
//! exactly the bug this module exists to prevent.

use chrono::NaiveDate;

use crate::errors::AppError;

/// Display names indexed by day-of-week (0 = Sunday .. 6 = Saturday).
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Display name for a day-of-week index, or `"Unknown"` out of range.
pub fn day_name(day_of_week: i16) -> &'static str {
    DAY_NAMES
        .get(day_of_week as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Parse a strict 24-hour `HH:MM` time into minutes since midnight.
///
/// Accepts exactly the shape `([01]\d|2[0-3]):([0-5]\d)`; anything else
/// (single-digit hours, `24:00`, seconds, whitespace) is rejected with a
/// 400 naming the offending string.
pub fn parse_hhmm(time: &str) -> Result<i32, AppError> {
    let bytes = time.as_bytes();
    let valid = bytes.len() == 5
        && bytes[2] == b':'
        && bytes.iter().enumerate().all(|(i, b)| i == 2 || b.is_ascii_digit());

    if !valid {
        return Err(invalid_time(time));
    }

    let hours = (bytes[0] - b'0') as i32 * 10 + (bytes[1] - b'0') as i32;
    let minutes = (bytes[3] - b'0') as i32 * 10 + (bytes[4] - b'0') as i32;

    if hours > 23 || minutes > 59 {
        return Err(invalid_time(time));
    }

    Ok(hours * 60 + minutes)
}

fn invalid_time(time: &str) -> AppError {
    AppError::bad_request(anyhow::anyhow!(
        "Invalid time format: {time}. Expected format: HH:MM (24-hour)"
    ))
}

/// Check whether two `[start, end)` time ranges overlap.
///
/// Fails with the `parse_hhmm` error if any of the four strings is not a
/// valid `HH:MM` time.
pub fn times_overlap(
    a_start: &str,
    a_end: &str,
    b_start: &str,
    b_end: &str,
) -> Result<bool, AppError> {
    let a_start = parse_hhmm(a_start)?;
    let a_end = parse_hhmm(a_end)?;
    let b_start = parse_hhmm(b_start)?;
    let b_end = parse_hhmm(b_end)?;

    Ok(a_start < b_end && a_end > b_start)
}

/// Check whether two inclusive `[from, until]` date ranges overlap.
pub fn periods_overlap(
    a_from: NaiveDate,
    a_until: NaiveDate,
    b_from: NaiveDate,
    b_until: NaiveDate,
) -> bool {
    a_from <= b_until && a_until >= b_from
}
