//! Occurrence save rules and local-time views.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use eventide_db::model::occurrence::{NewOccurrence, Occurrence};
use eventide_rfc::rfc::time;
use uuid::Uuid;

use crate::context::ExpansionContext;
use crate::error::{ServiceError, ServiceResult};

/// Caller edits to an existing occurrence.
///
/// Built from the stored row with [`OccurrenceEdit::from`], changed, then
/// handed to `EventTimeline::save_occurrence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceEdit {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub is_hidden: bool,
    pub cancel_reason: Option<String>,
    pub external_ref: Option<String>,
    pub status: Option<String>,
}

impl From<&Occurrence> for OccurrenceEdit {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            start: occurrence.start_utc,
            end: occurrence.end_utc,
            is_all_day: occurrence.is_all_day,
            is_hidden: occurrence.is_hidden,
            cancel_reason: occurrence.cancel_reason.clone(),
            external_ref: occurrence.external_ref.clone(),
            status: occurrence.status.clone(),
        }
    }
}

impl OccurrenceEdit {
    /// ## Summary
    /// Applies the edit to a stored occurrence following the save rules.
    ///
    /// A user modification protects the occurrence from regeneration and
    /// sets it cancelled exactly when a cancel reason is present. Original
    /// start and end are never touched.
    ///
    /// ## Errors
    /// Returns `ServiceError::ValidationError` if the end precedes the start.
    pub fn apply_to(
        self,
        occurrence: &mut Occurrence,
        user_modified: bool,
        ctx: &ExpansionContext,
    ) -> ServiceResult<()> {
        let (start, end) = day_normalized(self.start, self.end, self.is_all_day, ctx)?;
        if end < start {
            return Err(ServiceError::ValidationError(format!(
                "Occurrence end {end} is before its start {start}"
            )));
        }

        occurrence.start_utc = start;
        occurrence.end_utc = end;
        occurrence.is_all_day = self.is_all_day;
        occurrence.is_hidden = self.is_hidden;
        occurrence.cancel_reason = self.cancel_reason.filter(|reason| !reason.trim().is_empty());
        occurrence.external_ref = self.external_ref;
        occurrence.status = self.status;

        if user_modified {
            occurrence.is_protected_from_regeneration = true;
            occurrence.is_cancelled = occurrence.cancel_reason.is_some();
        }
        Ok(())
    }
}

/// ## Summary
/// Moves all-day bounds to the start of their local days; timed bounds are
/// returned unchanged.
///
/// ## Errors
/// Returns an error if local midnight cannot be represented.
pub fn day_normalized(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_all_day: bool,
    ctx: &ExpansionContext,
) -> ServiceResult<(DateTime<Utc>, DateTime<Utc>)> {
    if is_all_day {
        Ok((ctx.start_of_local_day(start)?, ctx.start_of_local_day(end)?))
    } else {
        Ok((start, end))
    }
}

/// ## Summary
/// Builds a manually added occurrence. Manual additions are always
/// protected; `end` defaults to `start`.
///
/// ## Errors
/// Returns `ServiceError::ValidationError` if the end precedes the start.
pub fn manual_occurrence(
    event_id: Uuid,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> ServiceResult<NewOccurrence> {
    let end = end.unwrap_or(start);
    if end < start {
        return Err(ServiceError::ValidationError(format!(
            "Occurrence end {end} is before its start {start}"
        )));
    }

    Ok(NewOccurrence {
        id: Uuid::now_v7(),
        event_id,
        generator_id: None,
        start_utc: start,
        end_utc: end,
        is_all_day: false,
        original_start_utc: start,
        original_end_utc: end,
        is_protected_from_regeneration: true,
        is_cancelled: false,
        is_hidden: false,
        cancel_reason: None,
        external_ref: None,
        status: None,
    })
}

/// Local wall-clock views of an occurrence.
pub trait LocalOccurrence {
    fn local_start(&self, ctx: &ExpansionContext) -> NaiveDateTime;

    fn local_end(&self, ctx: &ExpansionContext) -> NaiveDateTime;

    /// ## Summary
    /// Returns true if the occurrence does not run past its start day.
    ///
    /// A timed occurrence may end exactly at the following midnight. An
    /// all-day occurrence is stored with both bounds at midnight, so it is
    /// same-day when both fall on the same date.
    fn is_same_day(&self, ctx: &ExpansionContext) -> bool;

    fn is_different_day(&self, ctx: &ExpansionContext) -> bool {
        !self.is_same_day(ctx)
    }
}

impl LocalOccurrence for Occurrence {
    fn local_start(&self, ctx: &ExpansionContext) -> NaiveDateTime {
        ctx.to_local(self.start_utc)
    }

    fn local_end(&self, ctx: &ExpansionContext) -> NaiveDateTime {
        ctx.to_local(self.end_utc)
    }

    fn is_same_day(&self, ctx: &ExpansionContext) -> bool {
        let start = self.local_start(ctx);
        let end = self.local_end(ctx);
        if self.is_all_day {
            end.date() == start.date()
        } else {
            end <= time::start_of_day(start) + TimeDelta::days(1)
        }
    }
}
