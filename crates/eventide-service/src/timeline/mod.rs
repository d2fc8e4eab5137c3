//! The event aggregate: an event with its generators and occurrences.
//!
//! [`EventTimeline`] reads through a [`TimelineStore`], memoizes derived
//! views and commits every mutation as a single change set. Each mutating
//! operation clears the memoized views before returning.

mod clone;
mod reconcile;

pub use clone::{clone_timeline, publishing_clone_relations};
pub use reconcile::{IdentitySet, MissingOccurrence, missing_occurrence_data, plan_extension};

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eventide_core::constants::DEFAULT_CANCEL_REASON;
use eventide_db::db::store::{TimelineChanges, TimelineStore};
use eventide_db::model::event::Event;
use eventide_db::model::generator::Generator;
use eventide_db::model::occurrence::{NewOccurrence, Occurrence, OccurrenceClass};
use uuid::Uuid;

use crate::context::ExpansionContext;
use crate::error::{ServiceError, ServiceResult};
use crate::generator::GeneratorInput;
use crate::occurrence::{LocalOccurrence, OccurrenceEdit, manual_occurrence};

#[derive(Debug, Default)]
struct TimelineCache {
    own_occurrences: Option<Vec<Occurrence>>,
    occurrence_list: Option<Vec<Occurrence>>,
    upcoming_occurrence_list: Option<Vec<Occurrence>>,
    generators: Option<Vec<Generator>>,
}

/// An event loaded for timeline work.
#[derive(Debug)]
pub struct EventTimeline<'s, S> {
    store: &'s S,
    ctx: ExpansionContext,
    event: Event,
    cache: TimelineCache,
}

/// Occurrences deleted and inserted by one regeneration pass.
struct Regeneration {
    delete: Vec<Uuid>,
    insert: Vec<NewOccurrence>,
}

impl<'s, S: TimelineStore> EventTimeline<'s, S> {
    /// ## Summary
    /// Loads an event for timeline work.
    ///
    /// ## Errors
    /// Returns `ServiceError::NotFound` if the event does not exist.
    pub async fn load(store: &'s S, event_id: Uuid, ctx: ExpansionContext) -> ServiceResult<Self> {
        let event = store
            .event(event_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;
        Ok(Self {
            store,
            ctx,
            event,
            cache: TimelineCache::default(),
        })
    }

    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn context(&self) -> &ExpansionContext {
        &self.ctx
    }

    /// ## Summary
    /// Drops every memoized view.
    pub fn invalidate_caches(&mut self) {
        self.cache = TimelineCache::default();
    }

    /// ## Summary
    /// Returns the occurrences stored against this event itself.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn own_occurrences(&mut self) -> ServiceResult<&[Occurrence]> {
        let own = match self.cache.own_occurrences.take() {
            Some(own) => own,
            None => self.store.occurrences_for_event(self.event.id).await?,
        };
        Ok(self.cache.own_occurrences.insert(own).as_slice())
    }

    /// ## Summary
    /// Returns this event's generators, earliest first.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn generators(&mut self) -> ServiceResult<&[Generator]> {
        let generators = match self.cache.generators.take() {
            Some(generators) => generators,
            None => self.store.generators_for_event(self.event.id).await?,
        };
        Ok(self.cache.generators.insert(generators).as_slice())
    }

    /// ## Summary
    /// Returns the effective timeline: this event's own occurrences if it
    /// has any, otherwise those of the nearest ancestor that does.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn occurrence_list(&mut self) -> ServiceResult<&[Occurrence]> {
        let list = match self.cache.occurrence_list.take() {
            Some(list) => list,
            None => {
                let own = self.own_occurrences().await?.to_vec();
                if own.is_empty() {
                    inherited_timeline(self.store, self.event.id, self.event.part_of_id, None)
                        .await?
                } else {
                    own
                }
            }
        };
        Ok(self.cache.occurrence_list.insert(list).as_slice())
    }

    /// ## Summary
    /// Returns the effective timeline restricted to occurrences that have
    /// not ended yet.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn upcoming_occurrence_list(&mut self) -> ServiceResult<&[Occurrence]> {
        let list = match self.cache.upcoming_occurrence_list.take() {
            Some(list) => list,
            None => {
                let now = self.ctx.now;
                if self.own_occurrences().await?.is_empty() {
                    inherited_timeline(self.store, self.event.id, self.event.part_of_id, Some(now))
                        .await?
                } else {
                    self.store
                        .upcoming_occurrences_for_event(self.event.id, now)
                        .await?
                }
            }
        };
        Ok(self.cache.upcoming_occurrence_list.insert(list).as_slice())
    }

    /// ## Summary
    /// Returns the first and last occurrence of the effective timeline.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn occurrences_range(
        &mut self,
    ) -> ServiceResult<(Option<Occurrence>, Option<Occurrence>)> {
        let list = self.occurrence_list().await?;
        Ok((list.first().cloned(), list.last().cloned()))
    }

    /// ## Summary
    /// Returns the generator slots not yet represented on the timeline.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read or a generator cannot
    /// be expanded.
    pub async fn missing_occurrence_data(
        &mut self,
        until: Option<DateTime<Utc>>,
    ) -> ServiceResult<Vec<MissingOccurrence>> {
        let ctx = self.ctx;
        let identity = IdentitySet::from_occurrences(self.occurrence_list().await?, &ctx);
        let generators = self.generators().await?;
        missing_occurrence_data(generators, &identity, until, &ctx)
    }

    /// ## Summary
    /// Materializes every missing generator slot as an occurrence. Existing
    /// occurrences are never touched.
    ///
    /// ## Errors
    /// Returns an error if expansion or the store write fails.
    #[tracing::instrument(skip(self), fields(event_id = %self.event.id))]
    pub async fn extend_occurrences(&mut self, until: Option<DateTime<Utc>>) -> ServiceResult<usize> {
        let event_id = self.event.id;
        let ctx = self.ctx;
        let planned: Vec<NewOccurrence> = self
            .missing_occurrence_data(until)
            .await?
            .into_iter()
            .map(|missing| missing.into_new(event_id, &ctx))
            .collect::<ServiceResult<_>>()?;

        let count = planned.len();
        if count > 0 {
            self.store
                .apply(TimelineChanges {
                    insert_occurrences: planned,
                    ..TimelineChanges::default()
                })
                .await?;
        }
        self.invalidate_caches();

        tracing::debug!(count, "Extended occurrences");

        Ok(count)
    }

    /// ## Summary
    /// Deletes every regeneratable occurrence and extends again, in one
    /// change set.
    ///
    /// ## Errors
    /// Returns an error if expansion or the store write fails.
    #[tracing::instrument(skip(self), fields(event_id = %self.event.id))]
    pub async fn regenerate_occurrences(
        &mut self,
        until: Option<DateTime<Utc>>,
    ) -> ServiceResult<usize> {
        let generators = self.generators().await?.to_vec();
        let regeneration = self.plan_regeneration(&generators, until).await?;
        let deleted = regeneration.delete.len();
        let count = regeneration.insert.len();

        self.store
            .apply(TimelineChanges {
                delete_occurrences: regeneration.delete,
                insert_occurrences: regeneration.insert,
                ..TimelineChanges::default()
            })
            .await?;
        self.invalidate_caches();

        tracing::debug!(deleted, count, "Regenerated occurrences");

        Ok(count)
    }

    /// ## Summary
    /// Cancels an occurrence of the effective timeline, marking it
    /// protected. Occurrences outside the timeline are left alone.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read or written.
    #[tracing::instrument(skip(self), fields(event_id = %self.event.id))]
    pub async fn cancel_occurrence(
        &mut self,
        occurrence_id: Uuid,
        hide: bool,
        reason: Option<&str>,
    ) -> ServiceResult<Option<Occurrence>> {
        let Some(mut occurrence) = self
            .occurrence_list()
            .await?
            .iter()
            .find(|occurrence| occurrence.id == occurrence_id)
            .cloned()
        else {
            tracing::debug!(%occurrence_id, "Occurrence not on timeline, nothing to cancel");
            return Ok(None);
        };

        occurrence.is_protected_from_regeneration = true;
        occurrence.is_cancelled = true;
        occurrence.is_hidden = hide;
        occurrence.cancel_reason = Some(reason.unwrap_or(DEFAULT_CANCEL_REASON).to_string());

        self.store
            .apply(TimelineChanges {
                update_occurrences: vec![(occurrence.id, occurrence.to_changeset(Utc::now()))],
                ..TimelineChanges::default()
            })
            .await?;
        self.invalidate_caches();

        Ok(self.store.occurrence(occurrence_id).await?)
    }

    /// ## Summary
    /// Adds a protected occurrence by hand; `end` defaults to `start`.
    ///
    /// ## Errors
    /// Returns an error if the end precedes the start or the write fails.
    #[tracing::instrument(skip(self), fields(event_id = %self.event.id))]
    pub async fn add_occurrence(
        &mut self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceResult<Occurrence> {
        let new = manual_occurrence(self.event.id, start, end)?;
        let id = new.id;

        self.store
            .apply(TimelineChanges {
                insert_occurrences: vec![new],
                ..TimelineChanges::default()
            })
            .await?;
        self.invalidate_caches();

        self.stored_occurrence(id).await
    }

    /// ## Summary
    /// Saves caller edits to one of this event's occurrences.
    ///
    /// ## Errors
    /// Returns `ServiceError::NotFound` if the occurrence does not belong to
    /// this event, or a validation or store error.
    #[tracing::instrument(skip(self, edit), fields(event_id = %self.event.id))]
    pub async fn save_occurrence(
        &mut self,
        occurrence_id: Uuid,
        edit: OccurrenceEdit,
        user_modified: bool,
    ) -> ServiceResult<Occurrence> {
        let mut occurrence = self
            .store
            .occurrence(occurrence_id)
            .await?
            .filter(|occurrence| occurrence.event_id == self.event.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "occurrence {occurrence_id} of event {}",
                    self.event.id
                ))
            })?;

        edit.apply_to(&mut occurrence, user_modified, &self.ctx)?;

        self.store
            .apply(TimelineChanges {
                update_occurrences: vec![(occurrence.id, occurrence.to_changeset(Utc::now()))],
                ..TimelineChanges::default()
            })
            .await?;
        self.invalidate_caches();

        self.stored_occurrence(occurrence_id).await
    }

    /// ## Summary
    /// Creates a generator, or updates one of this event's generators when
    /// `generator_id` is given, and regenerates the event in the same change
    /// set.
    ///
    /// ## Errors
    /// Returns `ServiceError::ValidationError` for invalid fields,
    /// `ServiceError::NotFound` for a generator of another event, or a store
    /// error.
    #[tracing::instrument(skip(self, input), fields(event_id = %self.event.id))]
    pub async fn save_generator(
        &mut self,
        generator_id: Option<Uuid>,
        input: GeneratorInput,
    ) -> ServiceResult<Generator> {
        let valid = input.normalize(&self.ctx)?;
        let mut generators = self.generators().await?.to_vec();
        let now = Utc::now();
        let mut changes = TimelineChanges::default();

        let saved_id = match generator_id {
            None => {
                let new = valid.into_new(Uuid::now_v7(), self.event.id);
                let id = new.id;
                generators.push(new.clone().into_generator(now));
                changes.insert_generators.push(new);
                id
            }
            Some(id) => {
                let generator = generators
                    .iter_mut()
                    .find(|generator| generator.id == id)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "generator {id} of event {}",
                            self.event.id
                        ))
                    })?;
                valid.apply_to(generator);
                changes
                    .update_generators
                    .push((id, generator.to_changeset(now)));
                id
            }
        };

        let regeneration = self.plan_regeneration(&generators, None).await?;
        changes.delete_occurrences = regeneration.delete;
        changes.insert_occurrences = regeneration.insert;

        self.store.apply(changes).await?;
        self.invalidate_caches();

        self.store
            .generator(saved_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("generator {saved_id}")))
    }

    /// ## Summary
    /// Deletes a generator and regenerates the event. Its unprotected
    /// occurrences go; protected ones stay without a generator.
    ///
    /// ## Errors
    /// Returns `ServiceError::NotFound` if the generator does not belong to
    /// this event, or a store error.
    #[tracing::instrument(skip(self), fields(event_id = %self.event.id))]
    pub async fn delete_generator(&mut self, generator_id: Uuid) -> ServiceResult<()> {
        let generators = self.generators().await?.to_vec();
        if !generators.iter().any(|generator| generator.id == generator_id) {
            return Err(ServiceError::NotFound(format!(
                "generator {generator_id} of event {}",
                self.event.id
            )));
        }
        let remaining: Vec<Generator> = generators
            .into_iter()
            .filter(|generator| generator.id != generator_id)
            .collect();

        let regeneration = self.plan_regeneration(&remaining, None).await?;
        self.store
            .apply(TimelineChanges {
                delete_occurrences: regeneration.delete,
                insert_occurrences: regeneration.insert,
                delete_generators: vec![generator_id],
                ..TimelineChanges::default()
            })
            .await?;
        self.invalidate_caches();

        Ok(())
    }

    /// ## Summary
    /// Returns the sorted local dates of non-cancelled occurrences.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn start_dates_set(&mut self) -> ServiceResult<Vec<NaiveDate>> {
        let ctx = self.ctx;
        let dates: BTreeSet<NaiveDate> = self
            .occurrence_list()
            .await?
            .iter()
            .filter(|occurrence| !occurrence.is_cancelled)
            .map(|occurrence| occurrence.local_start(&ctx).date())
            .collect();
        Ok(dates.into_iter().collect())
    }

    /// ## Summary
    /// Returns the sorted local start times of non-cancelled timed
    /// occurrences.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn start_times_set(&mut self) -> ServiceResult<Vec<NaiveTime>> {
        let ctx = self.ctx;
        let times: BTreeSet<NaiveTime> = self
            .occurrence_list()
            .await?
            .iter()
            .filter(|occurrence| !occurrence.is_cancelled && !occurrence.is_all_day)
            .map(|occurrence| occurrence.local_start(&ctx).time())
            .collect();
        Ok(times.into_iter().collect())
    }

    /// ## Summary
    /// Groups upcoming occurrences by local start date, in timeline order.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn upcoming_occurrences_by_day(
        &mut self,
    ) -> ServiceResult<Vec<(NaiveDate, Vec<Occurrence>)>> {
        let ctx = self.ctx;
        let mut days: Vec<(NaiveDate, Vec<Occurrence>)> = Vec::new();
        for occurrence in self.upcoming_occurrence_list().await? {
            let day = occurrence.local_start(&ctx).date();
            match days.iter_mut().find(|(existing, _)| *existing == day) {
                Some((_, occurrences)) => occurrences.push(occurrence.clone()),
                None => days.push((day, vec![occurrence.clone()])),
            }
        }
        Ok(days)
    }

    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn is_upcoming(&mut self) -> ServiceResult<bool> {
        Ok(!self.upcoming_occurrence_list().await?.is_empty())
    }

    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn next_occurrence(&mut self) -> ServiceResult<Option<Occurrence>> {
        Ok(self.upcoming_occurrence_list().await?.first().cloned())
    }

    /// ## Summary
    /// Returns true if the event has occurrences and none of them is
    /// upcoming.
    ///
    /// ## Errors
    /// Returns an error if the store cannot be read.
    pub async fn has_finished(&mut self) -> ServiceResult<bool> {
        let has_any = !self.occurrence_list().await?.is_empty();
        Ok(has_any && self.upcoming_occurrence_list().await?.is_empty())
    }

    async fn stored_occurrence(&self, id: Uuid) -> ServiceResult<Occurrence> {
        self.store
            .occurrence(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("occurrence {id}")))
    }

    /// Plans deletion of regeneratable occurrences and the extension that
    /// replaces them, for the given generator set.
    async fn plan_regeneration(
        &mut self,
        generators: &[Generator],
        until: Option<DateTime<Utc>>,
    ) -> ServiceResult<Regeneration> {
        let own = self.own_occurrences().await?.to_vec();
        let ctx = self.ctx;
        let (delete, insert) = regeneration_for(
            self.store,
            &self.event,
            &own,
            &[],
            generators,
            until,
            &ctx,
        )
        .await?;
        Ok(Regeneration { delete, insert })
    }
}

/// ## Summary
/// Plans a regeneration of `event` whose own occurrences are `own` plus the
/// not-yet-stored `incoming` ones.
///
/// Returns the ids of regeneratable occurrences to delete and the
/// occurrences to insert. When nothing survives the deletion, the identity
/// set falls back to the inherited timeline.
pub(crate) async fn regeneration_for<S: TimelineStore>(
    store: &S,
    event: &Event,
    own: &[Occurrence],
    incoming: &[NewOccurrence],
    generators: &[Generator],
    until: Option<DateTime<Utc>>,
    ctx: &ExpansionContext,
) -> ServiceResult<(Vec<Uuid>, Vec<NewOccurrence>)> {
    let (regeneratable, kept): (Vec<&Occurrence>, Vec<&Occurrence>) = own
        .iter()
        .partition(|occurrence| OccurrenceClass::Regeneratable.matches(occurrence));

    let identity = if kept.is_empty() && incoming.is_empty() {
        let inherited = inherited_timeline(store, event.id, event.part_of_id, None).await?;
        IdentitySet::from_occurrences(&inherited, ctx)
    } else {
        IdentitySet::from_originals(
            kept.iter()
                .map(|occurrence| (occurrence.original_start_utc, occurrence.original_end_utc))
                .chain(
                    incoming
                        .iter()
                        .map(|occurrence| (occurrence.original_start_utc, occurrence.original_end_utc)),
                ),
            ctx,
        )
    };

    let insert = plan_extension(event.id, generators, &identity, until, ctx)?;
    let delete = regeneratable.iter().map(|occurrence| occurrence.id).collect();
    Ok((delete, insert))
}

/// ## Summary
/// Walks `part_of` from `parent` and returns the occurrences of the first
/// ancestor that has any, optionally only those ending after `upcoming_after`.
///
/// Cycles in the parent chain end the walk with an empty timeline.
async fn inherited_timeline<S: TimelineStore>(
    store: &S,
    event_id: Uuid,
    mut parent: Option<Uuid>,
    upcoming_after: Option<DateTime<Utc>>,
) -> ServiceResult<Vec<Occurrence>> {
    let mut visited = HashSet::from([event_id]);

    while let Some(ancestor_id) = parent {
        if !visited.insert(ancestor_id) {
            tracing::warn!(%event_id, %ancestor_id, "Cycle in part_of chain");
            break;
        }
        let Some(ancestor) = store.event(ancestor_id).await? else {
            break;
        };

        let own = store.occurrences_for_event(ancestor.id).await?;
        if !own.is_empty() {
            return match upcoming_after {
                None => Ok(own),
                Some(now) => Ok(store.upcoming_occurrences_for_event(ancestor.id, now).await?),
            };
        }
        parent = ancestor.part_of_id;
    }

    Ok(Vec::new())
}
