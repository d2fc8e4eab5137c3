//! Derived views and parent inheritance.

use chrono::{NaiveDate, NaiveTime};
use eventide_db::db::store::{MemoryTimelineStore, TimelineStore};
use eventide_service::error::ServiceError;
use eventide_service::occurrence::OccurrenceEdit;
use eventide_service::timeline::EventTimeline;
use uuid::Uuid;

use super::helpers::*;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 10, d).unwrap()
}

/// ## Summary
/// An event without its own occurrences shows its parent's timeline.
#[test_log::test(tokio::test)]
async fn child_inherits_parent_timeline() {
    let store = MemoryTimelineStore::new();
    let mut parent = seed_timeline(&store, "Swim Season", daily_week(), ctx()).await;
    let child_event = seed_child_event(&store, "Swim Season: Lane 1", parent.event().id).await;
    let grandchild_event =
        seed_child_event(&store, "Swim Season: Lane 1 Juniors", child_event.id).await;

    let mid_week = ctx_at(at(2016, 10, 4, 12, 0));
    let mut child = EventTimeline::load(&store, child_event.id, mid_week)
        .await
        .unwrap();
    let mut grandchild = EventTimeline::load(&store, grandchild_event.id, mid_week)
        .await
        .unwrap();

    let inherited = parent.occurrence_list().await.unwrap().to_vec();
    assert_eq!(child.occurrence_list().await.unwrap(), inherited.as_slice());
    assert_eq!(grandchild.occurrence_list().await.unwrap(), inherited.as_slice());

    let upcoming = child.upcoming_occurrence_list().await.unwrap();
    assert_eq!(
        starts(upcoming),
        vec![
            at(2016, 10, 5, 9, 0),
            at(2016, 10, 6, 9, 0),
            at(2016, 10, 7, 9, 0)
        ]
    );
    let next = child.next_occurrence().await.unwrap().unwrap();
    assert_eq!(next.start_utc, at(2016, 10, 5, 9, 0));

    child
        .add_occurrence(at(2016, 10, 20, 9, 0), Some(at(2016, 10, 20, 10, 0)))
        .await
        .unwrap();
    let own = child.occurrence_list().await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].event_id, child_event.id);

    grandchild.invalidate_caches();
    assert_eq!(grandchild.occurrence_list().await.unwrap().len(), 1);
}

/// ## Summary
/// A cycle in the parent chain ends inheritance instead of looping.
#[test_log::test(tokio::test)]
async fn parent_cycle_yields_empty_timeline() {
    let store = MemoryTimelineStore::new();
    let first_id = Uuid::now_v7();
    let second_id = Uuid::now_v7();

    let mut first = eventide_db::model::event::NewEvent::new("First", "first");
    first.id = first_id;
    let mut second = eventide_db::model::event::NewEvent::new("Second", "second");
    second.id = second_id;
    second.part_of_id = Some(first_id);
    first.part_of_id = Some(second_id);
    store
        .apply(eventide_db::db::store::TimelineChanges {
            insert_events: vec![first, second],
            ..Default::default()
        })
        .await
        .unwrap();

    let mut timeline = EventTimeline::load(&store, first_id, ctx()).await.unwrap();
    assert!(timeline.occurrence_list().await.unwrap().is_empty());
    assert_eq!(timeline.occurrences_range().await.unwrap(), (None, None));
}

/// ## Summary
/// Loading an unknown event is a not-found error.
#[test_log::test(tokio::test)]
async fn unknown_event_is_not_found() {
    let store = MemoryTimelineStore::new();
    let err = EventTimeline::load(&store, Uuid::now_v7(), ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

/// ## Summary
/// Date and time sets skip cancelled occurrences; day groups keep them.
#[test_log::test(tokio::test)]
async fn date_and_time_sets() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    let list = timeline.occurrence_list().await.unwrap().to_vec();

    timeline
        .cancel_occurrence(list[1].id, false, None)
        .await
        .unwrap();
    let mut edit = OccurrenceEdit::from(&list[2]);
    edit.start = at(2016, 10, 3, 11, 0);
    edit.end = at(2016, 10, 3, 11, 45);
    timeline.save_occurrence(list[2].id, edit, true).await.unwrap();

    let dates = timeline.start_dates_set().await.unwrap();
    assert_eq!(
        dates,
        vec![date(1), date(3), date(4), date(5), date(6), date(7)]
    );

    let times = timeline.start_times_set().await.unwrap();
    assert_eq!(
        times,
        vec![
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap()
        ]
    );

    let by_day = timeline.upcoming_occurrences_by_day().await.unwrap();
    assert_eq!(by_day.len(), 7);
    assert_eq!(by_day[1].0, date(2));
    assert!(by_day[1].1[0].is_cancelled);
}

/// ## Summary
/// Range, upcoming and finished views follow the context's notion of now.
#[test_log::test(tokio::test)]
async fn range_and_finished() {
    let store = MemoryTimelineStore::new();
    let mut timeline = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;

    let (first, last) = timeline.occurrences_range().await.unwrap();
    assert_eq!(first.unwrap().start_utc, at(2016, 10, 1, 9, 0));
    assert_eq!(last.unwrap().start_utc, at(2016, 10, 7, 9, 0));
    assert!(timeline.is_upcoming().await.unwrap());
    assert!(!timeline.has_finished().await.unwrap());

    let mut later = EventTimeline::load(&store, timeline.event().id, ctx_at(at(2016, 10, 10, 0, 0)))
        .await
        .unwrap();
    assert!(!later.is_upcoming().await.unwrap());
    assert!(later.has_finished().await.unwrap());
    assert!(later.next_occurrence().await.unwrap().is_none());

    let empty_event = seed_event(&store, "To Be Announced").await;
    let mut empty = EventTimeline::load(&store, empty_event.id, ctx()).await.unwrap();
    assert!(!empty.has_finished().await.unwrap());
}

/// ## Summary
/// Range queries span events and can leave hidden occurrences out.
#[test_log::test(tokio::test)]
async fn range_query_across_events() {
    let store = MemoryTimelineStore::new();
    let mut swim = seed_timeline(&store, "Morning Swim", daily_week(), ctx()).await;
    seed_timeline(&store, "Saturday Tour", weekly_ten(), ctx()).await;
    let third = swim.occurrence_list().await.unwrap()[2].clone();
    swim.cancel_occurrence(third.id, true, None).await.unwrap();

    // 3 to 5 October: swims on the 3rd, 4th and 5th, the tour on the 3rd
    let all = store
        .occurrences_in_range(at(2016, 10, 3, 0, 0), at(2016, 10, 6, 0, 0), true)
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let visible = store
        .occurrences_in_range(at(2016, 10, 3, 0, 0), at(2016, 10, 6, 0, 0), false)
        .await
        .unwrap();
    assert_eq!(visible.len(), 3);
    assert!(visible.iter().all(|o| o.id != third.id));
}
