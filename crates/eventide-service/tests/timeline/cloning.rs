//! Timeline cloning and variations.

use eventide_db::db::store::{MemoryTimelineStore, TimelineStore};
use eventide_service::calendar::{CloneableField, DEFAULT_CLONEABLE_FIELDS};
use eventide_service::error::ServiceError;
use eventide_service::generator::GeneratorInput;
use eventide_service::occurrence::OccurrenceEdit;
use eventide_service::timeline::{EventTimeline, clone_timeline, publishing_clone_relations};

use super::helpers::*;

/// ## Summary
/// Splitting a ten-week series at the fifth week leaves four weeks on the
/// original and moves the rest to the variation.
#[test_log::test(tokio::test)]
async fn variation_splits_weekly_series() {
    let store = MemoryTimelineStore::new();
    let mut original = seed_timeline(&store, "Evening Class", weekly_ten(), ctx()).await;
    let list = original.occurrence_list().await.unwrap().to_vec();
    assert_eq!(list.len(), 10);
    let fifth = list[4].clone();

    let variation = original
        .make_variation(fifth.id, DEFAULT_CLONEABLE_FIELDS)
        .await
        .expect("Failed to make variation");

    assert_eq!(variation.derived_from_id, Some(original.event().id));
    assert_eq!(variation.title, "Evening Class");
    assert!(variation.slug.starts_with("evening-class-"));

    let kept = original.occurrence_list().await.unwrap();
    assert_eq!(starts(kept), starts(&list[..4]));
    let truncated = original.generators().await.unwrap()[0].clone();
    assert_eq!(truncated.repeat_end_utc, Some(fifth.start_utc));

    let mut split = EventTimeline::load(&store, variation.id, ctx()).await.unwrap();
    let moved = split.occurrence_list().await.unwrap();
    assert_eq!(moved.len(), 6);
    assert_eq!(moved[0].start_utc, fifth.original_start_utc);
    assert_eq!(starts(moved), starts(&list[4..]));
    assert!(moved.iter().all(|o| o.event_id == variation.id));

    let generators = split.generators().await.unwrap();
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].start_utc, fifth.start_utc);
}

/// ## Summary
/// A series bounded by its own `COUNT` keeps its total length when split:
/// the variation's rule only counts the weeks the original gives up.
#[test_log::test(tokio::test)]
async fn variation_of_counted_series_keeps_total() {
    let store = MemoryTimelineStore::new();
    let counted = GeneratorInput::new(at(2016, 10, 3, 18, 0), at(2016, 10, 3, 20, 0))
        .with_rule("FREQ=WEEKLY;COUNT=10");
    let mut original = seed_timeline(&store, "Evening Class", counted, ctx()).await;
    let list = original.occurrence_list().await.unwrap().to_vec();
    assert_eq!(list.len(), 10);

    let variation = original
        .make_variation(list[4].id, DEFAULT_CLONEABLE_FIELDS)
        .await
        .expect("Failed to make variation");

    let kept = original.occurrence_list().await.unwrap().to_vec();
    assert_eq!(starts(&kept), starts(&list[..4]));

    let mut split = EventTimeline::load(&store, variation.id, ctx()).await.unwrap();
    let generators = split.generators().await.unwrap();
    assert_eq!(generators[0].rule_text.as_deref(), Some("FREQ=WEEKLY;COUNT=6"));
    let moved = split.occurrence_list().await.unwrap();
    assert_eq!(starts(moved), starts(&list[4..]));
    assert_eq!(kept.len() + moved.len(), 10);

    split.regenerate_occurrences(None).await.unwrap();
    assert_eq!(split.occurrence_list().await.unwrap().len(), 6);
}

/// ## Summary
/// Protected occurrences after the split move to the variation without
/// being duplicated there.
#[test_log::test(tokio::test)]
async fn variation_carries_edited_occurrences() {
    let store = MemoryTimelineStore::new();
    let mut original = seed_timeline(&store, "Evening Class", weekly_ten(), ctx()).await;
    let list = original.occurrence_list().await.unwrap().to_vec();

    let mut edit = OccurrenceEdit::from(&list[6]);
    edit.start = at(2016, 11, 14, 19, 0);
    edit.end = at(2016, 11, 14, 21, 0);
    original.save_occurrence(list[6].id, edit, true).await.unwrap();

    let variation = original
        .make_variation(list[4].id, &[CloneableField::ShowInCalendar])
        .await
        .unwrap();
    assert_eq!(variation.title, "");
    assert!(variation.show_in_calendar);

    let mut split = EventTimeline::load(&store, variation.id, ctx()).await.unwrap();
    let generator_id = split.generators().await.unwrap()[0].id;
    let moved = split.occurrence_list().await.unwrap();
    assert_eq!(moved.len(), 6);
    let carried: Vec<_> = moved
        .iter()
        .filter(|o| o.is_protected_from_regeneration)
        .collect();
    assert_eq!(carried.len(), 1);
    assert_eq!(carried[0].start_utc, at(2016, 11, 14, 19, 0));
    assert_eq!(carried[0].generator_id, Some(generator_id));
    assert!(!starts(moved).contains(&at(2016, 11, 14, 18, 0)));

    assert_eq!(original.occurrence_list().await.unwrap().len(), 4);
    assert!(store.occurrence(list[6].id).await.unwrap().is_none());
}

/// ## Summary
/// Splitting at an occurrence outside the timeline fails and writes nothing.
#[test_log::test(tokio::test)]
async fn variation_requires_timeline_occurrence() {
    let store = MemoryTimelineStore::new();
    let mut original = seed_timeline(&store, "Evening Class", weekly_ten(), ctx()).await;
    let mut other = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let foreign = other.occurrence_list().await.unwrap()[0].clone();
    let event_count = store.event_ids().await.unwrap().len();

    let err = original
        .make_variation(foreign.id, DEFAULT_CLONEABLE_FIELDS)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::DomainInvariant(_)));
    assert_eq!(store.event_ids().await.unwrap().len(), event_count);
    assert_eq!(original.occurrence_list().await.unwrap().len(), 10);
}

/// ## Summary
/// An all-day series split mid-way stops on the day before the split.
#[test_log::test(tokio::test)]
async fn all_day_variation_stops_day_before() {
    let store = MemoryTimelineStore::new();
    let input = GeneratorInput::new(
        at(2016, 10, 1, 0, 0),
        at(2016, 10, 1, 0, 0),
    )
    .with_rule("FREQ=DAILY")
    .with_repeat_end(at(2016, 10, 10, 0, 0))
    .all_day();
    let mut original = seed_timeline(&store, "Book Fair", input, ctx()).await;
    let list = original.occurrence_list().await.unwrap().to_vec();
    assert_eq!(list.len(), 10);

    let variation = original
        .make_variation(list[6].id, DEFAULT_CLONEABLE_FIELDS)
        .await
        .unwrap();

    assert_eq!(
        starts(original.occurrence_list().await.unwrap()),
        starts(&list[..6])
    );
    let mut split = EventTimeline::load(&store, variation.id, ctx()).await.unwrap();
    assert_eq!(starts(split.occurrence_list().await.unwrap()), starts(&list[6..]));
}

/// ## Summary
/// Cloning copies generators and carried-over occurrences, then fills the
/// destination from the copied generators.
#[test_log::test(tokio::test)]
async fn clone_timeline_copies_onto_destination() {
    let store = MemoryTimelineStore::new();
    let mut draft = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let list = draft.occurrence_list().await.unwrap().to_vec();
    let mut edit = OccurrenceEdit::from(&list[2]);
    edit.start = at(2016, 10, 3, 11, 0);
    edit.end = at(2016, 10, 3, 11, 45);
    draft.save_occurrence(list[2].id, edit, true).await.unwrap();
    draft
        .add_occurrence(at(2016, 10, 10, 12, 0), None)
        .await
        .unwrap();
    let source_generator = draft.generators().await.unwrap()[0].clone();

    let published = seed_event(&store, "Morning Swim (published)").await;
    let applied = clone_timeline(&store, draft.event().id, published.id, &ctx())
        .await
        .expect("Failed to clone timeline");
    assert_eq!(applied.generators_inserted, 1);
    assert_eq!(applied.occurrences_inserted, 8);

    let mut copy = EventTimeline::load(&store, published.id, ctx()).await.unwrap();
    let generators = copy.generators().await.unwrap().to_vec();
    assert_eq!(generators.len(), 1);
    assert_ne!(generators[0].id, source_generator.id);
    assert_eq!(generators[0].rule_text, source_generator.rule_text);

    let copied = copy.occurrence_list().await.unwrap();
    assert_eq!(copied.len(), 8);
    let edited = copied
        .iter()
        .find(|o| o.start_utc == at(2016, 10, 3, 11, 0))
        .expect("Edited occurrence should be copied");
    assert!(edited.is_protected_from_regeneration);
    assert_eq!(edited.generator_id, Some(generators[0].id));
    assert!(!starts(copied).contains(&at(2016, 10, 3, 9, 0)));
    assert!(copied.iter().any(|o| o.start_utc == at(2016, 10, 10, 12, 0) && o.generator_id.is_none()));

    assert_eq!(draft.occurrence_list().await.unwrap().len(), 8);
}

/// ## Summary
/// The publishing hook copies a timeline back onto a draft, replacing the
/// draft's regeneratable occurrences.
#[test_log::test(tokio::test)]
async fn publishing_hook_clones_timeline() {
    let store = MemoryTimelineStore::new();
    let mut published = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let draft = seed_event(&store, "Morning Swim (draft)").await;

    publishing_clone_relations(&store, published.event().id, draft.id, &ctx())
        .await
        .unwrap();
    let mut copy = EventTimeline::load(&store, draft.id, ctx()).await.unwrap();
    assert_eq!(
        starts(copy.occurrence_list().await.unwrap()),
        starts(published.occurrence_list().await.unwrap())
    );

    let missing = seed_event(&store, "Nowhere").await;
    let err = publishing_clone_relations(&store, uuid::Uuid::now_v7(), missing.id, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
