//! The scheduled extension pass.

use chrono::{TimeDelta, Utc};
use eventide_db::db::store::{MemoryTimelineStore, TimelineChanges, TimelineStore};
use eventide_db::model::generator::NewGenerator;
use eventide_service::generator::GeneratorInput;
use eventide_service::maintenance::extend_all_events;
use eventide_service::timeline::EventTimeline;
use uuid::Uuid;

use super::helpers::*;

/// ## Summary
/// The pass extends open-ended rules to the horizon, skips complete
/// timelines and counts events that fail.
#[test_log::test(tokio::test)]
async fn extends_every_event_to_horizon() {
    let store = MemoryTimelineStore::new();
    let short_limit = ctx().with_repeat_limit(TimeDelta::weeks(1));

    let open_ended = GeneratorInput::new(at(2016, 10, 1, 9, 0), at(2016, 10, 1, 10, 0))
        .with_rule("FREQ=DAILY");
    let mut gallery = seed_timeline(&store, "Gallery Walk", open_ended, short_limit).await;
    assert_eq!(gallery.occurrence_list().await.unwrap().len(), 7);

    seed_timeline(&store, "Morning Swim", daily_week(), short_limit).await;

    // Bypasses validation to store a rule that no longer parses
    let broken = seed_event(&store, "Broken Rule").await;
    store
        .apply(TimelineChanges {
            insert_generators: vec![NewGenerator {
                id: Uuid::now_v7(),
                event_id: broken.id,
                rule_text: Some("FREQ=SOMETIMES".to_string()),
                start_utc: at(2016, 10, 1, 9, 0),
                end_utc: at(2016, 10, 1, 10, 0),
                is_all_day: false,
                repeat_end_utc: None,
            }],
            ..TimelineChanges::default()
        })
        .await
        .unwrap();

    let report = extend_all_events(&store, &ctx(), TimeDelta::weeks(4), 2)
        .await
        .expect("Maintenance pass failed");
    assert_eq!(report.events, 3);
    assert_eq!(report.occurrences_created, 21);
    assert_eq!(report.failures, 1);

    gallery.invalidate_caches();
    let list = gallery.occurrence_list().await.unwrap();
    assert_eq!(list.len(), 28);
    assert_eq!(list[27].start_utc, at(2016, 10, 28, 9, 0));

    let again = extend_all_events(&store, &ctx(), TimeDelta::weeks(4), 2)
        .await
        .unwrap();
    assert_eq!(again.occurrences_created, 0);
}

/// ## Summary
/// A pass over an empty store reports nothing.
#[test_log::test(tokio::test)]
async fn empty_store_reports_nothing() {
    let store = MemoryTimelineStore::new();
    let report = extend_all_events(&store, &ctx_at(Utc::now()), TimeDelta::weeks(13), 0)
        .await
        .unwrap();
    assert_eq!(report, eventide_service::maintenance::MaintenanceReport::default());

    let event = seed_event(&store, "Quiet Week").await;
    let mut timeline = EventTimeline::load(&store, event.id, ctx()).await.unwrap();
    assert!(timeline.occurrence_list().await.unwrap().is_empty());
}
