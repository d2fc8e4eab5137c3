use chrono::{DateTime, TimeZone, Utc};
use eventide_core::util::slug::generate_slug;
use eventide_db::db::store::{MemoryTimelineStore, TimelineStore};
use eventide_db::model::event::{Event, NewEvent};
use eventide_db::model::occurrence::Occurrence;
use eventide_service::context::ExpansionContext;
use eventide_service::generator::GeneratorInput;
use eventide_service::timeline::EventTimeline;
use uuid::Uuid;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// UTC context at midnight on 1 October 2016.
pub fn ctx() -> ExpansionContext {
    ExpansionContext::new(chrono_tz::UTC, at(2016, 10, 1, 0, 0))
}

pub fn ctx_at(now: DateTime<Utc>) -> ExpansionContext {
    ExpansionContext::new(chrono_tz::UTC, now)
}

pub async fn seed_event(store: &MemoryTimelineStore, title: &str) -> Event {
    store
        .create_event(NewEvent::new(title, generate_slug(title)))
        .await
        .expect("Failed to seed event")
}

pub async fn seed_child_event(store: &MemoryTimelineStore, title: &str, parent: Uuid) -> Event {
    let mut event = NewEvent::new(title, generate_slug(title));
    event.part_of_id = Some(parent);
    store
        .create_event(event)
        .await
        .expect("Failed to seed child event")
}

/// Daily 09:00-09:45 from 1 to 7 October 2016.
pub fn daily_week() -> GeneratorInput {
    GeneratorInput::new(at(2016, 10, 1, 9, 0), at(2016, 10, 1, 9, 45))
        .with_rule("FREQ=DAILY")
        .with_repeat_end(at(2016, 10, 7, 9, 45))
}

/// Weekly Monday 18:00-20:00, ten times from 3 October 2016.
pub fn weekly_ten() -> GeneratorInput {
    GeneratorInput::new(at(2016, 10, 3, 18, 0), at(2016, 10, 3, 20, 0))
        .with_rule("FREQ=WEEKLY")
        .with_repeat_end(at(2016, 12, 5, 20, 0))
}

/// Seeds an event with one generator and returns its loaded timeline.
pub async fn seed_timeline<'s>(
    store: &'s MemoryTimelineStore,
    title: &str,
    input: GeneratorInput,
    ctx: ExpansionContext,
) -> EventTimeline<'s, MemoryTimelineStore> {
    let event = seed_event(store, title).await;
    let mut timeline = EventTimeline::load(store, event.id, ctx)
        .await
        .expect("Failed to load timeline");
    timeline
        .save_generator(None, input)
        .await
        .expect("Failed to save generator");
    timeline
}

pub fn starts(occurrences: &[Occurrence]) -> Vec<DateTime<Utc>> {
    occurrences.iter().map(|occurrence| occurrence.start_utc).collect()
}

pub fn start_end_multiset(occurrences: &[Occurrence]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut pairs: Vec<_> = occurrences
        .iter()
        .map(|occurrence| (occurrence.start_utc, occurrence.end_utc))
        .collect();
    pairs.sort();
    pairs
}
