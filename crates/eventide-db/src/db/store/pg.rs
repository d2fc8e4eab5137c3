//! Postgres-backed timeline store.

use std::future::Future;

use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use super::{AppliedChanges, TimelineChanges, TimelineStore};
use crate::db::DbProvider;
use crate::db::connection::{DbConnection, DbPool};
use crate::db::query;
use crate::error::{DbError, DbResult};
use crate::model::event::Event;
use crate::model::generator::Generator;
use crate::model::occurrence::{Occurrence, OccurrenceClass};
use crate::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};

/// Timeline store over a pooled Postgres connection.
#[derive(Clone)]
pub struct PgTimelineStore {
    pool: DbPool,
}

impl PgTimelineStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgTimelineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTimelineStore").finish_non_exhaustive()
    }
}

impl TimelineStore for PgTimelineStore {
    fn event(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Event>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::event::find(&mut conn, id).await?)
        }
    }

    fn event_ids(&self) -> impl Future<Output = DbResult<Vec<Uuid>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::event::ids(&mut conn).await?)
        }
    }

    fn generator(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Generator>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::generator::find(&mut conn, id).await?)
        }
    }

    fn generators_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Generator>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::generator::load_by_event(&mut conn, event_id).await?)
        }
    }

    fn occurrence(&self, id: Uuid) -> impl Future<Output = DbResult<Option<Occurrence>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::occurrence::find(&mut conn, id).await?)
        }
    }

    fn occurrences_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::occurrence::load(&mut conn, query::occurrence::by_event(event_id)).await?)
        }
    }

    fn upcoming_occurrences_for_event(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            let upcoming = query::occurrence::upcoming_by_event(event_id, now);
            Ok(query::occurrence::load(&mut conn, upcoming).await?)
        }
    }

    fn occurrences_by_class(
        &self,
        event_id: Uuid,
        class: OccurrenceClass,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            let matching = query::occurrence::by_event_and_class(event_id, class);
            Ok(query::occurrence::load(&mut conn, matching).await?)
        }
    }

    fn occurrences_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_hidden: bool,
    ) -> impl Future<Output = DbResult<Vec<Occurrence>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            let overlapping = query::occurrence::overlapping(start, end, include_hidden);
            Ok(query::occurrence::load(&mut conn, overlapping).await?)
        }
    }

    fn recurrence_rule_by_description(
        &self,
        description: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            let lookup = query::recurrence_rule::by_description(description);
            Ok(query::recurrence_rule::first(&mut conn, lookup).await?)
        }
    }

    fn recurrence_rule_by_text(
        &self,
        rule_text: &str,
    ) -> impl Future<Output = DbResult<Option<RecurrenceRule>>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            let lookup = query::recurrence_rule::by_rule_text(rule_text);
            Ok(query::recurrence_rule::first(&mut conn, lookup).await?)
        }
    }

    fn create_recurrence_rule(
        &self,
        rule: NewRecurrenceRule,
    ) -> impl Future<Output = DbResult<RecurrenceRule>> + Send {
        async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(query::recurrence_rule::insert(&mut conn, &rule).await?)
        }
    }

    fn apply(
        &self,
        changes: TimelineChanges,
    ) -> impl Future<Output = DbResult<AppliedChanges>> + Send {
        async move {
            if changes.is_empty() {
                return Ok(AppliedChanges::default());
            }

            let mut conn = self.pool.get_connection().await?;
            let applied = conn
                .transaction::<_, DbError, _>(move |tx| {
                    async move { apply_in_transaction(tx, changes).await }.scope_boxed()
                })
                .await?;

            tracing::debug!(?applied, "Timeline changes committed");

            Ok(applied)
        }
    }
}

async fn apply_in_transaction(
    tx: &mut DbConnection<'_>,
    changes: TimelineChanges,
) -> DbResult<AppliedChanges> {
    let mut applied = AppliedChanges {
        events_inserted: query::event::insert_batch(tx, &changes.insert_events).await?,
        generators_inserted: query::generator::insert_batch(tx, &changes.insert_generators)
            .await?,
        ..AppliedChanges::default()
    };

    for (id, update) in &changes.update_generators {
        if query::generator::update(tx, *id, update).await? == 0 {
            return Err(DbError::MissingRow {
                table: "event_repeats_generator",
                id: *id,
            });
        }
        applied.generators_updated += 1;
    }

    applied.occurrences_deleted =
        query::occurrence::delete_by_ids(tx, &changes.delete_occurrences).await?;

    for (id, update) in &changes.update_occurrences {
        if query::occurrence::update(tx, *id, update).await? == 0 {
            return Err(DbError::MissingRow {
                table: "occurrence",
                id: *id,
            });
        }
        applied.occurrences_updated += 1;
    }

    applied.occurrences_inserted =
        query::occurrence::insert_batch(tx, &changes.insert_occurrences).await?;
    applied.generators_deleted =
        query::generator::delete_by_ids(tx, &changes.delete_generators).await?;

    Ok(applied)
}
