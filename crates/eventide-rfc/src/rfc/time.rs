//! Conversion between UTC instants and naive local wall-clock values.
//!
//! Recurrence rules are defined in local time, so "every day at 09:00" must
//! stay at 09:00 on both sides of a daylight-saving change. Arithmetic that
//! should preserve the time of day is done on naive local values and only
//! converted back to an instant at the end.

use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RfcError, RfcResult};

/// ## Summary
/// Returns the local wall-clock value of an instant.
#[must_use]
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// ## Summary
/// Converts a local wall-clock value to a UTC instant.
///
/// A value inside a daylight-saving fold resolves to its first occurrence.
///
/// ## Errors
/// Returns `RfcError::NonExistentTime` if the value falls in a gap.
pub fn from_local(local: NaiveDateTime, tz: Tz) -> RfcResult<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(RfcError::NonExistentTime {
            local,
            tzid: tz.name().to_string(),
        }),
    }
}

/// ## Summary
/// Converts a local wall-clock value to a UTC instant, shifting values that
/// fall in a daylight-saving gap forward by one hour.
///
/// ## Errors
/// Returns `RfcError::NonExistentTime` if the shifted value is still invalid.
pub fn from_local_lenient(local: NaiveDateTime, tz: Tz) -> RfcResult<DateTime<Utc>> {
    match from_local(local, tz) {
        Err(RfcError::NonExistentTime { .. }) => from_local(local + TimeDelta::hours(1), tz),
        other => other,
    }
}

/// ## Summary
/// Adds `delta` to an instant on the local wall clock.
///
/// `start + 2 days` computed this way keeps the local time of day even when
/// a daylight-saving change lies in between.
///
/// ## Errors
/// Returns an error if the shifted local value cannot be converted back.
pub fn shift_preserving_time_of_day(
    instant: DateTime<Utc>,
    delta: TimeDelta,
    tz: Tz,
) -> RfcResult<DateTime<Utc>> {
    from_local_lenient(to_local(instant, tz) + delta, tz)
}

/// ## Summary
/// Returns the start (00:00:00.000000) of the local day.
#[must_use]
pub fn start_of_day(local: NaiveDateTime) -> NaiveDateTime {
    local.date().and_time(NaiveTime::MIN)
}

/// ## Summary
/// Returns the last representable instant of the local day.
#[must_use]
pub fn last_instant_of_day(local: NaiveDateTime) -> NaiveDateTime {
    start_of_day(local) + TimeDelta::days(1) - TimeDelta::microseconds(1)
}

/// ## Summary
/// Returns true if the value is exactly on a day boundary.
#[must_use]
pub fn is_day_boundary(local: NaiveDateTime) -> bool {
    local.time() == NaiveTime::MIN
}
