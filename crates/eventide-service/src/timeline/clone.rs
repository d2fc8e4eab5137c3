//! Copying timelines between events: publishing duplicates and variations.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use eventide_core::util::slug::variation_slug;
use eventide_db::db::store::{AppliedChanges, TimelineChanges, TimelineStore};
use eventide_db::model::event::{Event, NewEvent};
use eventide_db::model::generator::{Generator, NewGenerator};
use eventide_db::model::occurrence::{NewOccurrence, Occurrence, OccurrenceClass};
use eventide_rfc::rfc::rrule::RuleText;
use eventide_rfc::rfc::time;
use uuid::Uuid;

use super::{EventTimeline, regeneration_for};
use crate::calendar::CloneableField;
use crate::context::ExpansionContext;
use crate::error::{ServiceError, ServiceResult};
use crate::generator::{first_slot_on_or_after, slots_before};

/// True for occurrences a regeneration would not recreate.
fn carried_over(occurrence: &Occurrence) -> bool {
    !OccurrenceClass::Regeneratable.matches(occurrence)
}

/// Copies generators to `event_id` under fresh ids, returning the rows and
/// the old-to-new id map.
fn copy_generators<'a, I>(generators: I, event_id: Uuid) -> (Vec<NewGenerator>, HashMap<Uuid, Uuid>)
where
    I: IntoIterator<Item = &'a Generator>,
{
    let mut ids = HashMap::new();
    let copies = generators
        .into_iter()
        .map(|generator| {
            let id = Uuid::now_v7();
            ids.insert(generator.id, id);
            NewGenerator {
                id,
                event_id,
                ..generator.to_new()
            }
        })
        .collect();
    (copies, ids)
}

fn copy_occurrences<'a, I>(
    occurrences: I,
    event_id: Uuid,
    generator_ids: &HashMap<Uuid, Uuid>,
) -> Vec<NewOccurrence>
where
    I: IntoIterator<Item = &'a Occurrence>,
{
    occurrences
        .into_iter()
        .map(|occurrence| {
            let generator_id = occurrence
                .generator_id
                .and_then(|id| generator_ids.get(&id).copied());
            occurrence.copy_for(event_id, generator_id)
        })
        .collect()
}

/// ## Summary
/// Copies the timeline of `source_id` onto `dest_id` as one change set.
///
/// Manually added and protected occurrences are copied first; generators
/// follow and regenerate the destination, whose identity set already holds
/// the copied occurrences.
///
/// ## Errors
/// Returns `ServiceError::NotFound` if either event is missing, or an
/// expansion or store error.
#[tracing::instrument(skip(store, ctx))]
pub async fn clone_timeline<S: TimelineStore>(
    store: &S,
    source_id: Uuid,
    dest_id: Uuid,
    ctx: &ExpansionContext,
) -> ServiceResult<AppliedChanges> {
    let dest = store
        .event(dest_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event {dest_id}")))?;
    if store.event(source_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("event {source_id}")));
    }

    let source_generators = store.generators_for_event(source_id).await?;
    let source_occurrences = store.occurrences_for_event(source_id).await?;

    let (cloned_generators, generator_ids) = copy_generators(&source_generators, dest_id);
    let cloned_occurrences = copy_occurrences(
        source_occurrences.iter().filter(|occurrence| carried_over(occurrence)),
        dest_id,
        &generator_ids,
    );

    let now = Utc::now();
    let mut generators = store.generators_for_event(dest_id).await?;
    generators.extend(
        cloned_generators
            .iter()
            .cloned()
            .map(|generator| generator.into_generator(now)),
    );
    let dest_own = store.occurrences_for_event(dest_id).await?;
    let (delete, regenerated) = regeneration_for(
        store,
        &dest,
        &dest_own,
        &cloned_occurrences,
        &generators,
        None,
        ctx,
    )
    .await?;

    let mut insert_occurrences = cloned_occurrences;
    insert_occurrences.extend(regenerated);

    let applied = store
        .apply(TimelineChanges {
            insert_generators: cloned_generators,
            delete_occurrences: delete,
            insert_occurrences,
            ..TimelineChanges::default()
        })
        .await?;

    tracing::debug!(
        generators = applied.generators_inserted,
        occurrences = applied.occurrences_inserted,
        "Cloned timeline"
    );

    Ok(applied)
}

/// ## Summary
/// Hook for the publishing workflow: copies the timeline of a draft onto
/// its published copy, or back.
///
/// ## Errors
/// See [`clone_timeline`].
pub async fn publishing_clone_relations<S: TimelineStore>(
    store: &S,
    source_id: Uuid,
    dest_id: Uuid,
    ctx: &ExpansionContext,
) -> ServiceResult<AppliedChanges> {
    clone_timeline(store, source_id, dest_id, ctx).await
}

impl<S: TimelineStore> EventTimeline<'_, S> {
    /// ## Summary
    /// Splits the event at one of its occurrences into a new variation.
    ///
    /// The variation copies the selected fields, takes over every
    /// occurrence from the split point on, and gets copies of the
    /// generators re-anchored at their first slot on or after the split.
    /// A copied `COUNT` rule only counts the slots this event gives up.
    /// This event's generators stop repeating before the split, and its
    /// occurrences from the split point on are removed. Both timelines are
    /// regenerated in the same change set.
    ///
    /// ## Errors
    /// Returns `ServiceError::DomainInvariant` if the occurrence is not on
    /// this event's timeline, or an expansion or store error.
    #[tracing::instrument(skip(self, cloned_fields), fields(event_id = %self.event.id))]
    pub async fn make_variation(
        &mut self,
        split_occurrence_id: Uuid,
        cloned_fields: &[CloneableField],
    ) -> ServiceResult<Event> {
        let event_id = self.event.id;
        let split_at = self
            .occurrence_list()
            .await?
            .iter()
            .find(|occurrence| occurrence.id == split_occurrence_id)
            .map(|occurrence| occurrence.start_utc)
            .ok_or_else(|| {
                ServiceError::DomainInvariant(format!(
                    "occurrence {split_occurrence_id} is not on the timeline of event {event_id}"
                ))
            })?;

        let ctx = self.ctx;
        let now = Utc::now();
        let generators = self.generators().await?.to_vec();
        let own = self.own_occurrences().await?.to_vec();

        let variation = self.variation_of(cloned_fields);
        let variation_event = variation.clone().into_event(now);

        // Variation side
        let mut variation_generators = Vec::new();
        let mut generator_ids = HashMap::new();
        for generator in &generators {
            let Some(slot) = first_slot_on_or_after(generator, split_at, &ctx)? else {
                continue;
            };
            // The two halves of a COUNT rule share its original count
            let mut rule_text = generator.rule_text.clone();
            if let Some(rule) = generator.rule_text.as_deref().map(RuleText::parse).transpose()?
                && let Some(count) = rule.count()
            {
                let kept = slots_before(generator, split_at, &ctx)?;
                let remaining = u32::try_from(kept).map_or(0, |kept| count.saturating_sub(kept));
                if remaining == 0 {
                    continue;
                }
                rule_text = Some(rule.with_count(remaining).to_string());
            }
            let id = Uuid::now_v7();
            generator_ids.insert(generator.id, id);
            variation_generators.push(NewGenerator {
                id,
                event_id: variation.id,
                rule_text,
                start_utc: slot.start,
                end_utc: slot.end,
                ..generator.to_new()
            });
        }
        let (after_split, before_split): (Vec<Occurrence>, Vec<Occurrence>) = own
            .into_iter()
            .partition(|occurrence| occurrence.start_utc >= split_at);
        let cloned_occurrences = copy_occurrences(
            after_split.iter().filter(|occurrence| carried_over(occurrence)),
            variation.id,
            &generator_ids,
        );
        let expanded: Vec<Generator> = variation_generators
            .iter()
            .cloned()
            .map(|generator| generator.into_generator(now))
            .collect();
        let (_, variation_regenerated) = regeneration_for(
            self.store,
            &variation_event,
            &[],
            &cloned_occurrences,
            &expanded,
            None,
            &ctx,
        )
        .await?;

        // Original side
        let mut changes = TimelineChanges::default();
        let mut kept_generators = Vec::new();
        for mut generator in generators {
            if generator.start_utc >= split_at {
                changes.delete_generators.push(generator.id);
                continue;
            }
            if generator.rule_text.is_some() {
                let Some(cutoff) = repeat_cutoff(&generator, split_at, &ctx)? else {
                    changes.delete_generators.push(generator.id);
                    continue;
                };
                generator.repeat_end_utc = Some(
                    generator
                        .repeat_end_utc
                        .map_or(cutoff, |repeat_end| repeat_end.min(cutoff)),
                );
                changes
                    .update_generators
                    .push((generator.id, generator.to_changeset(now)));
            }
            kept_generators.push(generator);
        }
        let (delete, regenerated) = regeneration_for(
            self.store,
            &self.event,
            &before_split,
            &[],
            &kept_generators,
            None,
            &ctx,
        )
        .await?;

        changes.insert_events.push(variation);
        changes.insert_generators = variation_generators;
        changes.delete_occurrences = after_split.iter().map(|occurrence| occurrence.id).collect();
        changes.delete_occurrences.extend(delete);
        changes.insert_occurrences = cloned_occurrences;
        changes.insert_occurrences.extend(variation_regenerated);
        changes.insert_occurrences.extend(regenerated);

        self.store.apply(changes).await?;
        self.invalidate_caches();

        tracing::debug!(variation_id = %variation_event.id, %split_at, "Made variation");

        self.store
            .event(variation_event.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("event {}", variation_event.id)))
    }

    fn variation_of(&self, cloned_fields: &[CloneableField]) -> NewEvent {
        let id = Uuid::now_v7();
        let mut variation = NewEvent::new(String::new(), variation_slug(&self.event.slug, id));
        variation.id = id;
        variation.derived_from_id = Some(self.event.id);
        for field in cloned_fields {
            match field {
                CloneableField::Title => variation.title.clone_from(&self.event.title),
                CloneableField::ShowInCalendar => {
                    variation.show_in_calendar = self.event.show_in_calendar;
                }
                CloneableField::PartOf => variation.part_of_id = self.event.part_of_id,
            }
        }
        variation
    }
}

/// Repeat end that stops a generator before `split_at`, or `None` if the
/// generator would have nothing left.
///
/// All-day generators stop at the start of the day before the split day,
/// which their day-extended bound turns into "through the previous day".
fn repeat_cutoff(
    generator: &Generator,
    split_at: DateTime<Utc>,
    ctx: &ExpansionContext,
) -> ServiceResult<Option<DateTime<Utc>>> {
    let cutoff = if generator.is_all_day {
        let split_day = time::start_of_day(ctx.to_local(split_at));
        ctx.from_local(split_day - TimeDelta::days(1))?
    } else {
        split_at
    };
    Ok((cutoff >= generator.start_utc).then_some(cutoff))
}
