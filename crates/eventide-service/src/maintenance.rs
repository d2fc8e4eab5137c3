//! The periodic pass that keeps every event's timeline filled ahead.

use chrono::TimeDelta;
use eventide_db::db::store::TimelineStore;
use futures::StreamExt;

use crate::context::ExpansionContext;
use crate::error::ServiceResult;
use crate::timeline::EventTimeline;

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub events: usize,
    pub occurrences_created: usize,
    pub failures: usize,
}

/// ## Summary
/// Extends every event's occurrences up to `now + horizon`, working on up
/// to `concurrency` events at once.
///
/// A failing event is logged and counted; the pass carries on with the
/// rest.
///
/// ## Errors
/// Returns an error only if the list of events cannot be read.
#[tracing::instrument(skip(store, ctx), fields(now = %ctx.now))]
pub async fn extend_all_events<S: TimelineStore>(
    store: &S,
    ctx: &ExpansionContext,
    horizon: TimeDelta,
    concurrency: usize,
) -> ServiceResult<MaintenanceReport> {
    let until = ctx.now + horizon;
    let event_ids = store.event_ids().await?;
    let ctx = *ctx;

    let results: Vec<_> = futures::stream::iter(event_ids)
        .map(|event_id| async move {
            let extended: ServiceResult<usize> = async {
                let mut timeline = EventTimeline::load(store, event_id, ctx).await?;
                timeline.extend_occurrences(Some(until)).await
            }
            .await;
            (event_id, extended)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = MaintenanceReport::default();
    for (event_id, extended) in results {
        report.events += 1;
        match extended {
            Ok(created) => report.occurrences_created += created,
            Err(err) => {
                tracing::error!(%event_id, error = %err, "Failed to extend event occurrences");
                report.failures += 1;
            }
        }
    }

    tracing::info!(
        events = report.events,
        created = report.occurrences_created,
        failures = report.failures,
        "Maintenance pass finished"
    );

    Ok(report)
}
