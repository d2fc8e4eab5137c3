//! Models for the event repeats generator table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::event_repeats_generator;

/// A recurrence template attached to an event.
///
/// `start_utc` and `end_utc` describe the first occurrence; the rule text
/// repeats it until `repeat_end_utc`, the rule's own terminator, or the
/// repeat limit.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = event_repeats_generator)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Generator {
    pub id: Uuid,
    pub event_id: Uuid,
    pub rule_text: Option<String>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    /// Exclusive upper bound on occurrence starts.
    pub repeat_end_utc: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New generator for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = event_repeats_generator)]
pub struct NewGenerator {
    pub id: Uuid,
    pub event_id: Uuid,
    pub rule_text: Option<String>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub repeat_end_utc: Option<DateTime<Utc>>,
}

/// Mutable generator fields.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = event_repeats_generator)]
#[diesel(treat_none_as_null = true)]
pub struct GeneratorChangeset {
    pub rule_text: Option<String>,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_all_day: bool,
    pub repeat_end_utc: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Generator {
    /// ## Summary
    /// Returns the stored fields as an insert row.
    #[must_use]
    pub fn to_new(&self) -> NewGenerator {
        NewGenerator {
            id: self.id,
            event_id: self.event_id,
            rule_text: self.rule_text.clone(),
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            repeat_end_utc: self.repeat_end_utc,
        }
    }

    /// ## Summary
    /// Returns the mutable fields as a changeset stamped with `now`.
    #[must_use]
    pub fn to_changeset(&self, now: DateTime<Utc>) -> GeneratorChangeset {
        GeneratorChangeset {
            rule_text: self.rule_text.clone(),
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            repeat_end_utc: self.repeat_end_utc,
            updated_at: now,
        }
    }
}

impl NewGenerator {
    #[must_use]
    pub fn into_generator(self, now: DateTime<Utc>) -> Generator {
        Generator {
            id: self.id,
            event_id: self.event_id,
            rule_text: self.rule_text,
            start_utc: self.start_utc,
            end_utc: self.end_utc,
            is_all_day: self.is_all_day,
            repeat_end_utc: self.repeat_end_utc,
            created_at: now,
            updated_at: now,
        }
    }
}

impl GeneratorChangeset {
    /// ## Summary
    /// Writes the changeset onto a stored row.
    pub fn apply_to(&self, generator: &mut Generator) {
        generator.rule_text.clone_from(&self.rule_text);
        generator.start_utc = self.start_utc;
        generator.end_utc = self.end_utc;
        generator.is_all_day = self.is_all_day;
        generator.repeat_end_utc = self.repeat_end_utc;
        generator.updated_at = self.updated_at;
    }
}
