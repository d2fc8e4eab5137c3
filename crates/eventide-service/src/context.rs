//! Time context for recurrence expansion.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use eventide_core::config::EventsConfig;
use eventide_core::constants::DEFAULT_REPEAT_LIMIT_WEEKS;
use eventide_rfc::rfc::time;

use crate::error::ServiceResult;

/// Everything expansion needs to know about "now" and the local clock.
///
/// Passed explicitly so a run is reproducible: the same generators and the
/// same context always yield the same occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionContext {
    pub time_zone: Tz,
    pub now: DateTime<Utc>,
    /// Horizon for rules with neither a repeat end nor a caller bound.
    pub repeat_limit: TimeDelta,
}

impl ExpansionContext {
    #[must_use]
    pub fn new(time_zone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            time_zone,
            now,
            repeat_limit: TimeDelta::weeks(i64::from(DEFAULT_REPEAT_LIMIT_WEEKS)),
        }
    }

    /// ## Summary
    /// Builds a context from configuration at the given instant.
    ///
    /// ## Errors
    /// Returns an error if the configured time zone is unknown.
    pub fn from_config(events: &EventsConfig, now: DateTime<Utc>) -> ServiceResult<Self> {
        Ok(Self {
            time_zone: events.time_zone()?,
            now,
            repeat_limit: events.repeat_limit(),
        })
    }

    #[must_use]
    pub fn with_repeat_limit(mut self, repeat_limit: TimeDelta) -> Self {
        self.repeat_limit = repeat_limit;
        self
    }

    #[must_use]
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        time::to_local(instant, self.time_zone)
    }

    /// ## Summary
    /// Converts a local wall-clock value back to an instant. Values in a
    /// daylight-saving gap move forward by an hour.
    ///
    /// ## Errors
    /// Returns an error if the value cannot be represented in the zone.
    pub fn from_local(&self, local: NaiveDateTime) -> ServiceResult<DateTime<Utc>> {
        Ok(time::from_local_lenient(local, self.time_zone)?)
    }

    /// ## Summary
    /// Adds `delta` on the local wall clock, so the result keeps the local
    /// time of day across daylight-saving changes.
    ///
    /// ## Errors
    /// Returns an error if the shifted value cannot be represented.
    pub fn localize_preserving_time_of_day(
        &self,
        instant: DateTime<Utc>,
        delta: TimeDelta,
    ) -> ServiceResult<DateTime<Utc>> {
        Ok(time::shift_preserving_time_of_day(
            instant,
            delta,
            self.time_zone,
        )?)
    }

    /// ## Summary
    /// Returns the start of the local day containing `instant`.
    ///
    /// ## Errors
    /// Returns an error if local midnight cannot be represented.
    pub fn start_of_local_day(&self, instant: DateTime<Utc>) -> ServiceResult<DateTime<Utc>> {
        self.from_local(time::start_of_day(self.to_local(instant)))
    }
}
