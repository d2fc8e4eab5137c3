use chrono::{NaiveDateTime, TimeDelta};
use rrule::{RRuleSet, Tz};

use crate::error::{RfcError, RfcResult};

/// Evaluator for a complete rule spec (`DTSTART` plus `RRULE`/`RDATE`).
///
/// All values going in and out are naive local wall-clock times.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    inner: RRuleSet,
}

impl RecurrenceSet {
    /// ## Summary
    /// Parses a complete rule spec.
    ///
    /// ## Errors
    /// Returns `RfcError::ValidationError` if the spec is rejected by the
    /// rule evaluator.
    pub fn parse(spec: &str) -> RfcResult<Self> {
        let inner = spec.parse::<RRuleSet>().map_err(|err| {
            RfcError::ValidationError(format!("invalid rule spec {spec:?}: {err}"))
        })?;
        Ok(Self { inner })
    }

    /// ## Summary
    /// Returns the start times strictly between `lower` and `upper`, in
    /// ascending order.
    #[must_use]
    pub fn between(&self, lower: NaiveDateTime, upper: NaiveDateTime) -> Vec<NaiveDateTime> {
        if upper <= lower {
            return Vec::new();
        }

        // Evaluator bounds are widened and exclusivity applied here, so the
        // result does not depend on how the evaluator treats its own bounds.
        let result = self
            .inner
            .clone()
            .after(to_evaluator(lower - TimeDelta::seconds(1)))
            .before(to_evaluator(upper + TimeDelta::seconds(1)))
            .all(u16::MAX);

        if result.limited {
            tracing::warn!(
                %lower,
                %upper,
                returned = result.dates.len(),
                "Recurrence evaluation hit the instance limit; later instances are dropped"
            );
        }

        result
            .dates
            .iter()
            .map(chrono::DateTime::naive_utc)
            .filter(|instant| lower < *instant && *instant < upper)
            .collect()
    }

    /// ## Summary
    /// Returns true if `instant` is one of the set's start times.
    #[must_use]
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        let window = TimeDelta::microseconds(1);
        self.between(instant - window, instant + window)
            .contains(&instant)
    }

    /// ## Summary
    /// Counts every start time of a bounded set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.clone().all(u16::MAX).dates.len()
    }
}

fn to_evaluator(value: NaiveDateTime) -> chrono::DateTime<Tz> {
    value.and_utc().with_timezone(&Tz::UTC)
}
