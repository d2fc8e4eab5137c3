//! In-process timeline store.
//!
//! Mirrors the relational constraints of the Postgres schema: rows must
//! reference existing parents, deleting a generator clears the generator
//! reference of its occurrences, and a change set is staged on a copy that
//! only replaces the live state once every write has succeeded.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AppliedChanges, TimelineChanges, TimelineStore};
use crate::error::{DbError, DbResult};
use crate::model::event::Event;
use crate::model::generator::Generator;
use crate::model::occurrence::{Occurrence, OccurrenceClass, sort_occurrences};
use crate::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};

#[derive(Debug, Default)]
pub struct MemoryTimelineStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    generators: HashMap<Uuid, Generator>,
    occurrences: HashMap<Uuid, Occurrence>,
    rules: HashMap<Uuid, RecurrenceRule>,
}

impl MemoryTimelineStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn select_occurrences<F>(&self, predicate: F) -> Vec<Occurrence>
    where
        F: Fn(&Occurrence) -> bool + Send,
    {
        let state = self.state.read().await;
        let mut selected: Vec<Occurrence> = state
            .occurrences
            .values()
            .filter(|occurrence| predicate(occurrence))
            .cloned()
            .collect();
        sort_occurrences(&mut selected);
        selected
    }
}

impl MemoryState {
    fn stage(&mut self, changes: TimelineChanges, now: DateTime<Utc>) -> DbResult<AppliedChanges> {
        let mut applied = AppliedChanges::default();

        for new in changes.insert_events {
            if self.events.contains_key(&new.id) {
                return Err(DbError::DuplicateRow {
                    table: "event",
                    id: new.id,
                });
            }
            self.events.insert(new.id, new.into_event(now));
            applied.events_inserted += 1;
        }
        for event in self.events.values() {
            for parent in [event.part_of_id, event.derived_from_id].into_iter().flatten() {
                self.require_event(parent)?;
            }
        }

        for new in changes.insert_generators {
            self.require_event(new.event_id)?;
            if self.generators.contains_key(&new.id) {
                return Err(DbError::DuplicateRow {
                    table: "event_repeats_generator",
                    id: new.id,
                });
            }
            self.generators.insert(new.id, new.into_generator(now));
            applied.generators_inserted += 1;
        }

        for (id, update) in &changes.update_generators {
            let generator = self
                .generators
                .get_mut(id)
                .ok_or(DbError::MissingRow {
                    table: "event_repeats_generator",
                    id: *id,
                })?;
            update.apply_to(generator);
            applied.generators_updated += 1;
        }

        for id in &changes.delete_occurrences {
            if self.occurrences.remove(id).is_some() {
                applied.occurrences_deleted += 1;
            }
        }

        for (id, update) in &changes.update_occurrences {
            if let Some(generator_id) = update.generator_id {
                self.require_generator(generator_id)?;
            }
            let occurrence = self.occurrences.get_mut(id).ok_or(DbError::MissingRow {
                table: "occurrence",
                id: *id,
            })?;
            update.apply_to(occurrence);
            applied.occurrences_updated += 1;
        }

        for new in changes.insert_occurrences {
            self.require_event(new.event_id)?;
            if let Some(generator_id) = new.generator_id {
                self.require_generator(generator_id)?;
            }
            if self.occurrences.contains_key(&new.id) {
                return Err(DbError::DuplicateRow {
                    table: "occurrence",
                    id: new.id,
                });
            }
            self.occurrences.insert(new.id, new.into_occurrence(now));
            applied.occurrences_inserted += 1;
        }

        for id in &changes.delete_generators {
            if self.generators.remove(id).is_some() {
                applied.generators_deleted += 1;
                for occurrence in self.occurrences.values_mut() {
                    if occurrence.generator_id == Some(*id) {
                        occurrence.generator_id = None;
                    }
                }
            }
        }

        Ok(applied)
    }

    fn require_event(&self, id: Uuid) -> DbResult<()> {
        if self.events.contains_key(&id) {
            Ok(())
        } else {
            Err(DbError::MissingRow { table: "event", id })
        }
    }

    fn require_generator(&self, id: Uuid) -> DbResult<()> {
        if self.generators.contains_key(&id) {
            Ok(())
        } else {
            Err(DbError::MissingRow {
                table: "event_repeats_generator",
                id,
            })
        }
    }
}

impl TimelineStore for MemoryTimelineStore {
    fn event(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Event>>> + Send {
        async move { Ok(self.state.read().await.events.get(&id).cloned()) }
    }

    fn event_ids(&self) -> impl Future<Output = DbResult<Vec<Uuid>>> + Send {
        async move {
            let state = self.state.read().await;
            let mut events: Vec<&Event> = state.events.values().collect();
            events.sort_by_key(|event| (event.created_at, event.id));
            Ok(events.into_iter().map(|event| event.id).collect())
        }
    }

    fn generator(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Generator>>> + Send {
        async move { Ok(self.state.read().await.generators.get(&id).cloned()) }
    }

    fn generators_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Generator>>> + Send {
        async move {
            let state = self.state.read().await;
            let mut generators: Vec<Generator> = state
                .generators
                .values()
                .filter(|generator| generator.event_id == event_id)
                .cloned()
                .collect();
            generators.sort_by_key(|generator| (generator.start_utc, generator.id));
            Ok(generators)
        }
    }

    fn occurrence(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Occurrence>>> + Send {
        async move { Ok(self.state.read().await.occurrences.get(&id).cloned()) }
    }

    fn occurrences_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            Ok(self
                .select_occurrences(|occurrence| occurrence.event_id == event_id)
                .await)
        }
    }

    fn upcoming_occurrences_for_event(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            Ok(self
                .select_occurrences(|occurrence| {
                    occurrence.event_id == event_id && occurrence.end_utc > now
                })
                .await)
        }
    }

    fn occurrences_by_class(
        &self,
        event_id: Uuid,
        class: OccurrenceClass,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            Ok(self
                .select_occurrences(|occurrence| {
                    occurrence.event_id == event_id && class.matches(occurrence)
                })
                .await)
        }
    }

    fn occurrences_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_hidden: bool,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            Ok(self
                .select_occurrences(|occurrence| {
                    occurrence.start_utc < end
                        && occurrence.end_utc > start
                        && (include_hidden || !occurrence.is_hidden)
                })
                .await)
        }
    }

    fn recurrence_rule_by_description(
        &self,
        description: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send {
        async move {
            let state = self.state.read().await;
            Ok(state
                .rules
                .values()
                .find(|rule| rule.description == description)
                .cloned())
        }
    }

    fn recurrence_rule_by_text(
        &self,
        rule_text: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send {
        async move {
            let state = self.state.read().await;
            Ok(state
                .rules
                .values()
                .find(|rule| rule.rule_text == rule_text)
                .cloned())
        }
    }

    fn create_recurrence_rule(
        &self,
        rule: NewRecurrenceRule,
    ) -> impl Future<Output = DbResult<RecurrenceRule>> + Send {
        async move {
            let mut state = self.state.write().await;
            let duplicate = state.rules.values().any(|existing| {
                existing.description == rule.description || existing.rule_text == rule.rule_text
            });
            if duplicate || state.rules.contains_key(&rule.id) {
                return Err(DbError::DuplicateRow {
                    table: "recurrence_rule",
                    id: rule.id,
                });
            }
            let stored = rule.into_rule(Utc::now());
            state.rules.insert(stored.id, stored.clone());
            Ok(stored)
        }
    }

    fn apply(
        &self,
        changes: TimelineChanges,
    ) -> impl Future<Output = DbResult<AppliedChanges>> + Send {
        async move {
            let mut state = self.state.write().await;
            let mut staged = state.clone();
            let applied = staged.stage(changes, Utc::now())?;
            *state = staged;

            tracing::debug!(?applied, "Timeline changes committed");

            Ok(applied)
        }
    }
}
