//! Reconciliation of generator output against stored occurrences.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use eventide_db::model::generator::Generator;
use eventide_db::model::occurrence::{NewOccurrence, Occurrence};
use uuid::Uuid;

use crate::context::ExpansionContext;
use crate::error::ServiceResult;
use crate::generator::{OccurrenceSlot, generate};
use crate::occurrence::day_normalized;

/// Original start and end values already present on a timeline.
///
/// Starts and ends are matched independently: a candidate is considered
/// represented if either its start or its end is already known, which keeps
/// occurrences whose start or end alone was moved by an editor from being
/// duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySet {
    starts: HashSet<NaiveDateTime>,
    ends: HashSet<NaiveDateTime>,
}

impl IdentitySet {
    #[must_use]
    pub fn from_originals<I>(originals: I, ctx: &ExpansionContext) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    {
        let mut identity = Self::default();
        for (start, end) in originals {
            identity.starts.insert(ctx.to_local(start));
            identity.ends.insert(ctx.to_local(end));
        }
        identity
    }

    #[must_use]
    pub fn from_occurrences<'a, I>(occurrences: I, ctx: &ExpansionContext) -> Self
    where
        I: IntoIterator<Item = &'a Occurrence>,
    {
        Self::from_originals(
            occurrences
                .into_iter()
                .map(|occurrence| (occurrence.original_start_utc, occurrence.original_end_utc)),
            ctx,
        )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    #[must_use]
    pub fn represents(&self, slot: &OccurrenceSlot, ctx: &ExpansionContext) -> bool {
        self.starts.contains(&ctx.to_local(slot.start)) || self.ends.contains(&ctx.to_local(slot.end))
    }
}

/// A generator slot with no occurrence on the timeline yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingOccurrence {
    pub generator_id: Uuid,
    pub is_all_day: bool,
    pub slot: OccurrenceSlot,
}

impl MissingOccurrence {
    /// ## Summary
    /// Builds the unprotected occurrence for this slot.
    ///
    /// The originals keep the computed slot so later reconciliation passes
    /// recognise it; all-day start and end are moved to local midnight.
    ///
    /// ## Errors
    /// Returns an error if local midnight cannot be represented.
    pub fn into_new(self, event_id: Uuid, ctx: &ExpansionContext) -> ServiceResult<NewOccurrence> {
        let (start, end) = day_normalized(self.slot.start, self.slot.end, self.is_all_day, ctx)?;
        Ok(NewOccurrence {
            id: Uuid::now_v7(),
            event_id,
            generator_id: Some(self.generator_id),
            start_utc: start,
            end_utc: end,
            is_all_day: self.is_all_day,
            original_start_utc: self.slot.start,
            original_end_utc: self.slot.end,
            is_protected_from_regeneration: false,
            is_cancelled: false,
            is_hidden: false,
            cancel_reason: None,
            external_ref: None,
            status: None,
        })
    }
}

/// ## Summary
/// Expands every generator and returns the slots the identity set does not
/// already represent, generator by generator.
///
/// ## Errors
/// Returns an error if a generator cannot be expanded.
pub fn missing_occurrence_data(
    generators: &[Generator],
    identity: &IdentitySet,
    until: Option<DateTime<Utc>>,
    ctx: &ExpansionContext,
) -> ServiceResult<Vec<MissingOccurrence>> {
    let mut missing = Vec::new();
    for generator in generators {
        for slot in generate(generator, until, ctx)? {
            if identity.represents(&slot, ctx) {
                continue;
            }
            missing.push(MissingOccurrence {
                generator_id: generator.id,
                is_all_day: generator.is_all_day,
                slot,
            });
        }
    }
    Ok(missing)
}

/// ## Summary
/// Plans the occurrences an extension pass would insert for `event_id`.
///
/// ## Errors
/// Returns an error if a generator cannot be expanded.
pub fn plan_extension(
    event_id: Uuid,
    generators: &[Generator],
    identity: &IdentitySet,
    until: Option<DateTime<Utc>>,
    ctx: &ExpansionContext,
) -> ServiceResult<Vec<NewOccurrence>> {
    missing_occurrence_data(generators, identity, until, ctx)?
        .into_iter()
        .map(|missing| missing.into_new(event_id, ctx))
        .collect()
}
