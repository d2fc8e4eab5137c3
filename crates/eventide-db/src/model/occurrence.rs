//! Models for the occurrence table.

use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::occurrence;

/// One concrete scheduled instance of an event.
///
/// `original_start_utc`/`original_end_utc` record the values the occurrence
/// was first created with and never change afterwards; they identify the
/// slot even when `start_utc`/`end_utc` have been edited.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = occurrence)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Occurrence {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Generator that produced this occurrence; `None` for manual additions
    /// and for occurrences whose generator has been deleted.
    pub generator_id: Option<Uuid>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub original_start_utc: DateTime<Utc>,
    pub original_end_utc: DateTime<Utc>,
    pub is_protected_from_regeneration: bool,
    pub is_cancelled: bool,
    pub is_hidden: bool,
    pub cancel_reason: Option<String>,
    pub external_ref: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New occurrence for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = occurrence)]
pub struct NewOccurrence {
    pub id: Uuid,
    pub event_id: Uuid,
    pub generator_id: Option<Uuid>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub original_start_utc: DateTime<Utc>,
    pub original_end_utc: DateTime<Utc>,
    pub is_protected_from_regeneration: bool,
    pub is_cancelled: bool,
    pub is_hidden: bool,
    pub cancel_reason: Option<String>,
    pub external_ref: Option<String>,
    pub status: Option<String>,
}

/// Mutable occurrence fields. Originals and ownership are not included.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = occurrence)]
#[diesel(treat_none_as_null = true)]
pub struct OccurrenceChangeset {
    pub generator_id: Option<Uuid>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub is_protected_from_regeneration: bool,
    pub is_cancelled: bool,
    pub is_hidden: bool,
    pub cancel_reason: Option<String>,
    pub external_ref: Option<String>,
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Classification of an event's occurrences used during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceClass {
    /// Added by hand, no generator.
    ManuallyAdded,
    /// Linked to a generator.
    Generated,
    Protected,
    Unprotected,
    /// Generated and not protected: safe to delete and recreate.
    Regeneratable,
}

impl OccurrenceClass {
    #[must_use]
    pub fn matches(self, occurrence: &Occurrence) -> bool {
        match self {
            Self::ManuallyAdded => occurrence.generator_id.is_none(),
            Self::Generated => occurrence.generator_id.is_some(),
            Self::Protected => occurrence.is_protected_from_regeneration,
            Self::Unprotected => !occurrence.is_protected_from_regeneration,
            Self::Regeneratable => {
                occurrence.generator_id.is_some() && !occurrence.is_protected_from_regeneration
            }
        }
    }
}

impl Occurrence {
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_utc - self.start_utc
    }

    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generator_id.is_some()
    }

    /// ## Summary
    /// Returns true once the occurrence has ended.
    #[must_use]
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.end_utc <= now
    }

    /// ## Summary
    /// Returns the mutable fields as a changeset stamped with `now`.
    #[must_use]
    pub fn to_changeset(&self, now: DateTime<Utc>) -> OccurrenceChangeset {
        OccurrenceChangeset {
            generator_id: self.generator_id,
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            is_protected_from_regeneration: self.is_protected_from_regeneration,
            is_cancelled: self.is_cancelled,
            is_hidden: self.is_hidden,
            cancel_reason: self.cancel_reason.clone(),
            external_ref: self.external_ref.clone(),
            status: self.status.clone(),
            updated_at: now,
        }
    }

    /// ## Summary
    /// Returns a copy for another event, keeping every field except identity
    /// and ownership.
    #[must_use]
    pub fn copy_for(&self, event_id: Uuid, generator_id: Option<Uuid>) -> NewOccurrence {
        NewOccurrence {
            id: Uuid::now_v7(),
            event_id,
            generator_id,
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            original_start_utc: self.original_start_utc,
            original_end_utc: self.original_end_utc,
            is_protected_from_regeneration: self.is_protected_from_regeneration,
            is_cancelled: self.is_cancelled,
            is_hidden: self.is_hidden,
            cancel_reason: self.cancel_reason.clone(),
            external_ref: self.external_ref.clone(),
            status: self.status.clone(),
        }
    }
}

impl NewOccurrence {
    #[must_use]
    pub fn into_occurrence(self, now: DateTime<Utc>) -> Occurrence {
        Occurrence {
            id: self.id,
            event_id: self.event_id,
            generator_id: self.generator_id,
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            original_start_utc: self.original_start_utc,
            original_end_utc: self.original_end_utc,
            is_protected_from_regeneration: self.is_protected_from_regeneration,
            is_cancelled: self.is_cancelled,
            is_hidden: self.is_hidden,
            cancel_reason: self.cancel_reason,
            external_ref: self.external_ref,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

impl OccurrenceChangeset {
    /// ## Summary
    /// Writes the changeset onto a stored row.
    pub fn apply_to(&self, occurrence: &mut Occurrence) {
        occurrence.generator_id = self.generator_id;
        occurrence.start_utc = self.start_utc;
        occurrence.end_utc = self.end_utc;
        occurrence.is_all_day = self.is_all_day;
        occurrence.is_protected_from_regeneration = self.is_protected_from_regeneration;
        occurrence.is_cancelled = self.is_cancelled;
        occurrence.is_hidden = self.is_hidden;
        occurrence.cancel_reason.clone_from(&self.cancel_reason);
        occurrence.external_ref.clone_from(&self.external_ref);
        occurrence.status.clone_from(&self.status);
        occurrence.updated_at = self.updated_at;
    }
}

/// ## Summary
/// Sorts occurrences by start, all-day first on ties, then event and id.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| {
        a.start_utc
            .cmp(&b.start_utc)
            .then_with(|| b.is_all_day.cmp(&a.is_all_day))
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.id.cmp(&b.id))
    });
}
