//! Storage seam for event timelines.
//!
//! Reads go through [`TimelineStore`]; every write is expressed as a
//! [`TimelineChanges`] set and committed by [`TimelineStore::apply`] as one
//! atomic unit. A failing change set leaves the store untouched.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::model::event::{Event, NewEvent};
use crate::model::generator::{Generator, GeneratorChangeset, NewGenerator};
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChangeset, OccurrenceClass};
use crate::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};

pub mod memory;
pub mod pg;

pub use memory::MemoryTimelineStore;
pub use pg::PgTimelineStore;

/// A batch of writes committed together.
///
/// Application order is fixed: events are inserted, then generators are
/// inserted and updated, then occurrences are deleted, updated and
/// inserted, and finally generators are deleted. Deleting a generator
/// clears the generator reference of any occurrence that still points at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineChanges {
    pub insert_events: Vec<NewEvent>,
    pub insert_generators: Vec<NewGenerator>,
    pub update_generators: Vec<(Uuid, GeneratorChangeset)>,
    pub delete_occurrences: Vec<Uuid>,
    pub update_occurrences: Vec<(Uuid, OccurrenceChangeset)>,
    pub insert_occurrences: Vec<NewOccurrence>,
    pub delete_generators: Vec<Uuid>,
}

impl TimelineChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insert_events.is_empty()
            && self.insert_generators.is_empty()
            && self.update_generators.is_empty()
            && self.delete_occurrences.is_empty()
            && self.update_occurrences.is_empty()
            && self.insert_occurrences.is_empty()
            && self.delete_generators.is_empty()
    }
}

/// Row counts reported by a committed change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    pub events_inserted: usize,
    pub generators_inserted: usize,
    pub generators_updated: usize,
    pub generators_deleted: usize,
    pub occurrences_deleted: usize,
    pub occurrences_updated: usize,
    pub occurrences_inserted: usize,
}

/// Persistence operations needed by the timeline services.
pub trait TimelineStore: Send + Sync {
    fn event(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Event>>> + Send;

    /// ## Summary
    /// Returns every event ID, oldest first.
    fn event_ids(&self) -> impl Future<Output = DbResult<Vec<Uuid>>> + Send;

    fn generator(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Generator>>> + Send;

    fn generators_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Generator>>> + Send;

    fn occurrence(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Occurrence>>> + Send;

    /// ## Summary
    /// Returns the event's own occurrences in timeline order.
    fn occurrences_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send;

    /// ## Summary
    /// Returns the event's own occurrences that end after `now`.
    fn upcoming_occurrences_for_event(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send;

    /// ## Summary
    /// Returns the event's own occurrences in one reconciliation class.
    fn occurrences_by_class(
        &self,
        event_id: Uuid,
        class: OccurrenceClass,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send;

    /// ## Summary
    /// Returns occurrences of any event overlapping `[start, end)`.
    fn occurrences_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_hidden: bool,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send;

    fn recurrence_rule_by_description(
        &self,
        description: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send;

    fn recurrence_rule_by_text(
        &self,
        rule_text: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send;

    /// ## Summary
    /// Adds a catalog rule.
    ///
    /// ## Errors
    /// Fails if the description or rule text is already in the catalog.
    fn create_recurrence_rule(
        &self,
        rule: NewRecurrenceRule,
    ) -> impl Future<Output = DbResult<RecurrenceRule>> + Send;

    /// ## Summary
    /// Commits a change set atomically.
    ///
    /// ## Errors
    /// Fails without writing anything if any part of the set fails,
    /// including updates addressed at rows that do not exist.
    fn apply(
        &self,
        changes: TimelineChanges,
    ) -> impl Future<Output = DbResult<AppliedChanges>> + Send;

    /// ## Summary
    /// Inserts a single event and returns the stored row.
    ///
    /// ## Errors
    /// Fails if the insert fails or the row cannot be read back.
    fn create_event(&self, event: NewEvent) -> impl Future<Output = DbResult<Event>> + Send {
        async move {
            let id = event.id;
            self.apply(TimelineChanges {
                insert_events: vec![event],
                ..TimelineChanges::default()
            })
            .await?;
            self.event(id)
                .await?
                .ok_or(crate::error::DbError::MissingRow { table: "event", id })
        }
    }
}
