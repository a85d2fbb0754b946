// src/model/dates.rs

//! Day-based date arithmetic.
//!
//! All persisted dates are calendar days (`NaiveDate`), i.e. already
//! normalised to local midnight; lag and duration are whole days.

use chrono::{NaiveDate, TimeDelta};

/// Move `date` by `days` (negative moves backwards), saturating at the
/// representable calendar range.
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

/// Number of calendar days covered by `[start, finish]`, both inclusive.
///
/// Returns 0 or a negative number when `finish` is before `start`.
pub fn inclusive_span(start: NaiveDate, finish: NaiveDate) -> i64 {
    (finish - start).num_days() + 1
}

/// Finish date of an activity starting on `start` and lasting `duration` days.
pub fn finish_from_start(start: NaiveDate, duration: u32) -> NaiveDate {
    shift_days(start, i64::from(duration.max(1)) - 1)
}

/// Start date of an activity finishing on `finish` and lasting `duration` days.
pub fn start_from_finish(finish: NaiveDate, duration: u32) -> NaiveDate {
    shift_days(finish, 1 - i64::from(duration.max(1)))
}

/// Clamp a signed day count into a duration (floors at 1).
pub fn duration_from_span(span: i64) -> u32 {
    u32::try_from(span.max(1)).unwrap_or(u32::MAX)
}
