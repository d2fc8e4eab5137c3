//! Expansion, extension and regeneration of generated occurrences.

use std::collections::HashSet;

use chrono::{TimeDelta, Timelike};
use eventide_db::db::store::{MemoryTimelineStore, TimelineChanges, TimelineStore};
use eventide_db::model::occurrence::OccurrenceClass;
use eventide_service::context::ExpansionContext;
use eventide_service::generator::GeneratorInput;
use eventide_service::occurrence::{LocalOccurrence, OccurrenceEdit};

use super::helpers::*;

/// ## Summary
/// A daily generator bounded by its repeat end yields one occurrence per day.
#[test_log::test(tokio::test)]
async fn daily_generator_yields_seven_occurrences() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;

    let list = timeline
        .occurrence_list()
        .await
        .expect("Failed to list occurrences")
        .to_vec();

    assert_eq!(list.len(), 7);
    assert_eq!(list[0].start_utc, at(2016, 10, 1, 9, 0));
    assert_eq!(list[6].start_utc, at(2016, 10, 7, 9, 0));
    assert!(list.iter().all(|o| o.duration() == TimeDelta::minutes(45)));
    assert!(list.iter().all(|o| OccurrenceClass::Regeneratable.matches(o)));
    assert!(list.iter().all(|o| o.original_start_utc == o.start_utc));
}

/// ## Summary
/// Extending a fully materialized timeline creates nothing.
#[test_log::test(tokio::test)]
async fn extend_is_additive_only() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let before = timeline.occurrence_list().await.unwrap().to_vec();

    let created = timeline.extend_occurrences(None).await.unwrap();

    assert_eq!(created, 0);
    assert_eq!(timeline.occurrence_list().await.unwrap(), before.as_slice());
}

/// ## Summary
/// Regeneration restores a deleted generated occurrence at its original time.
#[test_log::test(tokio::test)]
async fn regenerate_restores_deleted_occurrence() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let before = timeline.occurrence_list().await.unwrap().to_vec();

    store
        .apply(TimelineChanges {
            delete_occurrences: vec![before[3].id],
            ..TimelineChanges::default()
        })
        .await
        .expect("Failed to delete occurrence");
    timeline.invalidate_caches();
    assert_eq!(timeline.occurrence_list().await.unwrap().len(), 6);

    timeline.regenerate_occurrences(None).await.unwrap();

    let after = timeline.occurrence_list().await.unwrap();
    assert_eq!(starts(after), starts(&before));
}

/// ## Summary
/// A user edit survives regeneration and is not duplicated at its original
/// generated time.
#[test_log::test(tokio::test)]
async fn user_edit_survives_regeneration() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let third = timeline.occurrence_list().await.unwrap()[2].clone();

    let mut edit = OccurrenceEdit::from(&third);
    edit.start = at(2016, 10, 3, 11, 0);
    edit.end = at(2016, 10, 3, 11, 45);
    let saved = timeline
        .save_occurrence(third.id, edit, true)
        .await
        .expect("Failed to save occurrence");
    assert!(saved.is_protected_from_regeneration);
    assert!(!saved.is_cancelled);
    assert_eq!(saved.original_start_utc, at(2016, 10, 3, 9, 0));

    timeline.regenerate_occurrences(None).await.unwrap();

    let after = timeline.occurrence_list().await.unwrap();
    assert_eq!(after.len(), 7);
    assert_eq!(after[2].id, third.id);
    assert_eq!(after[2].start_utc, at(2016, 10, 3, 11, 0));
    assert!(!starts(after).contains(&at(2016, 10, 3, 9, 0)));
}

/// ## Summary
/// Two regenerations in a row produce the same timeline.
#[test_log::test(tokio::test)]
async fn regeneration_is_idempotent() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let first = timeline.occurrence_list().await.unwrap()[0].clone();
    timeline
        .cancel_occurrence(first.id, false, None)
        .await
        .unwrap();

    timeline.regenerate_occurrences(None).await.unwrap();
    let once = start_end_multiset(timeline.occurrence_list().await.unwrap());
    timeline.regenerate_occurrences(None).await.unwrap();
    let twice = start_end_multiset(timeline.occurrence_list().await.unwrap());

    assert_eq!(once.len(), 7);
    assert_eq!(once, twice);
}

/// ## Summary
/// Every protected occurrence is still present after regeneration.
#[test_log::test(tokio::test)]
async fn protected_occurrences_survive_regeneration() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let list = timeline.occurrence_list().await.unwrap().to_vec();

    timeline
        .cancel_occurrence(list[1].id, true, Some("Pool maintenance"))
        .await
        .unwrap();
    let mut edit = OccurrenceEdit::from(&list[3]);
    edit.end = at(2016, 10, 4, 10, 30);
    timeline.save_occurrence(list[3].id, edit, true).await.unwrap();
    timeline
        .add_occurrence(at(2016, 10, 9, 9, 0), Some(at(2016, 10, 9, 10, 0)))
        .await
        .unwrap();

    let protected_before: HashSet<_> = store
        .occurrences_by_class(timeline.event().id, OccurrenceClass::Protected)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(protected_before.len(), 3);

    timeline.regenerate_occurrences(None).await.unwrap();

    let protected_after: HashSet<_> = store
        .occurrences_by_class(timeline.event().id, OccurrenceClass::Protected)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert!(protected_before.is_subset(&protected_after));
    assert_eq!(timeline.occurrence_list().await.unwrap().len(), 8);
}

/// ## Summary
/// Missing occurrence data never repeats a known original start or end.
#[test_log::test(tokio::test)]
async fn missing_data_excludes_identity_set() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let list = timeline.occurrence_list().await.unwrap().to_vec();

    let mut edit = OccurrenceEdit::from(&list[2]);
    edit.start = at(2016, 10, 3, 8, 0);
    timeline.save_occurrence(list[2].id, edit, true).await.unwrap();
    store
        .apply(TimelineChanges {
            delete_occurrences: vec![list[4].id],
            ..TimelineChanges::default()
        })
        .await
        .unwrap();
    timeline.invalidate_caches();

    let current = timeline.occurrence_list().await.unwrap().to_vec();
    let missing = timeline.missing_occurrence_data(None).await.unwrap();

    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].slot.start, at(2016, 10, 5, 9, 0));
    for candidate in &missing {
        assert!(current.iter().all(|o| {
            o.original_start_utc != candidate.slot.start && o.original_end_utc != candidate.slot.end
        }));
    }
}

/// ## Summary
/// All-day generators span whole days and their occurrences sit on midnight.
#[test_log::test(tokio::test)]
async fn all_day_generator_spans_whole_days() {
    let store = MemoryTimelineStore::new();
    let input = GeneratorInput::new(at(2016, 10, 1, 0, 0), at(2016, 10, 3, 15, 0))
        .with_rule("FREQ=WEEKLY;COUNT=3")
        .all_day();
    let mut timeline = seed_timeline(&store, "Harvest Fair", input, ctx()).await;

    let generator = timeline.generators().await.unwrap()[0].clone();
    assert!(generator.is_all_day);
    assert_eq!(
        generator.end_utc - generator.start_utc,
        TimeDelta::days(3) - TimeDelta::microseconds(1)
    );

    let list = timeline.occurrence_list().await.unwrap().to_vec();
    assert_eq!(
        starts(&list),
        vec![
            at(2016, 10, 1, 0, 0),
            at(2016, 10, 8, 0, 0),
            at(2016, 10, 15, 0, 0)
        ]
    );
    for occurrence in &list {
        assert!(occurrence.is_all_day);
        assert_eq!(occurrence.duration(), TimeDelta::days(2));
        assert_eq!(
            occurrence.original_end_utc - occurrence.original_start_utc,
            TimeDelta::days(3) - TimeDelta::microseconds(1)
        );
        assert!(occurrence.is_different_day(&ctx()));
    }
}

/// ## Summary
/// A rule without any end is capped at the repeat limit.
#[test_log::test(tokio::test)]
async fn unbounded_rule_stops_at_repeat_limit() {
    let store = MemoryTimelineStore::new();
    let input = GeneratorInput::new(at(2016, 10, 1, 0, 0), at(2016, 10, 1, 1, 0))
        .with_rule("FREQ=DAILY");
    let mut timeline =
        seed_timeline(&store, "Night Market", input, ctx_at(at(2016, 10, 1, 10, 0))).await;

    let list = timeline.occurrence_list().await.unwrap();
    assert_eq!(list.len(), 13 * 7 + 1);
    assert_eq!(list[91].start_utc, at(2016, 12, 31, 0, 0));
}

/// ## Summary
/// Daily occurrences keep their local time of day across a daylight-saving
/// change.
#[test_log::test(tokio::test)]
async fn local_time_of_day_survives_dst() {
    let store = MemoryTimelineStore::new();
    let sydney = ExpansionContext::new(chrono_tz::Australia::Sydney, at(2017, 9, 1, 0, 0));
    // 09:00-17:00 AEST on 20 September 2017; daylight time starts 1 October
    let input = GeneratorInput::new(at(2017, 9, 19, 23, 0), at(2017, 9, 20, 7, 0))
        .with_rule("FREQ=DAILY;COUNT=31");
    let mut timeline = seed_timeline(&store, "Open Studio", input, sydney).await;

    let list = timeline.occurrence_list().await.unwrap().to_vec();
    assert_eq!(list.len(), 31);
    for occurrence in &list {
        assert_eq!(occurrence.local_start(&sydney).hour(), 9);
        assert_eq!(occurrence.local_end(&sydney).hour(), 17);
        assert!(occurrence.is_same_day(&sydney));
    }
    assert_eq!(list[0].duration(), TimeDelta::hours(8));
    assert_eq!(list[30].duration(), TimeDelta::hours(8));
    assert_ne!(list[0].start_utc.hour(), list[30].start_utc.hour());
}
