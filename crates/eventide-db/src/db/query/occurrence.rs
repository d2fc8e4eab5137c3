//! Query composition for `occurrence`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::occurrence;
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChangeset, OccurrenceClass};

/// ## Summary
/// Returns a query to select all occurrences in timeline order.
#[must_use]
pub fn all() -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    occurrence::table
        .order((
            occurrence::start_utc.asc(),
            occurrence::is_all_day.desc(),
            occurrence::event_id.asc(),
            occurrence::id.asc(),
        ))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find an occurrence by ID.
#[must_use]
pub fn by_id(id: Uuid) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(occurrence::id.eq(id))
}

/// ## Summary
/// Returns a query to find an event's own occurrences.
#[must_use]
pub fn by_event(event_id: Uuid) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(occurrence::event_id.eq(event_id))
}

/// ## Summary
/// Returns a query to find an event's occurrences that have not ended.
#[must_use]
pub fn upcoming_by_event(
    event_id: Uuid,
    now: DateTime<Utc>,
) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    by_event(event_id).filter(occurrence::end_utc.gt(now))
}

/// ## Summary
/// Returns a query to find an event's occurrences in one reconciliation class.
#[must_use]
pub fn by_event_and_class(
    event_id: Uuid,
    class: OccurrenceClass,
) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    let query = by_event(event_id);
    match class {
        OccurrenceClass::ManuallyAdded => query.filter(occurrence::generator_id.is_null()),
        OccurrenceClass::Generated => query.filter(occurrence::generator_id.is_not_null()),
        OccurrenceClass::Protected => {
            query.filter(occurrence::is_protected_from_regeneration.eq(true))
        }
        OccurrenceClass::Unprotected => {
            query.filter(occurrence::is_protected_from_regeneration.eq(false))
        }
        OccurrenceClass::Regeneratable => query
            .filter(occurrence::generator_id.is_not_null())
            .filter(occurrence::is_protected_from_regeneration.eq(false)),
    }
}

/// ## Summary
/// Returns a query to find occurrences overlapping `[start, end)` across all
/// events.
#[must_use]
pub fn overlapping(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    include_hidden: bool,
) -> occurrence::BoxedQuery<'static, diesel::pg::Pg> {
    let query = all()
        .filter(occurrence::start_utc.lt(end))
        .filter(occurrence::end_utc.gt(start));
    if include_hidden {
        query
    } else {
        query.filter(occurrence::is_hidden.eq(false))
    }
}

/// ## Summary
/// Loads the rows of an occurrence query.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn load(
    conn: &mut DbConnection<'_>,
    query: occurrence::BoxedQuery<'static, diesel::pg::Pg>,
) -> QueryResult<Vec<Occurrence>> {
    query.select(Occurrence::as_select()).load(conn).await
}

/// ## Summary
/// Loads an occurrence by ID.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Occurrence>> {
    by_id(id)
        .select(Occurrence::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts multiple occurrences in a batch.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert_batch(
    conn: &mut DbConnection<'_>,
    occurrences: &[NewOccurrence],
) -> QueryResult<usize> {
    if occurrences.is_empty() {
        return Ok(0);
    }

    diesel::insert_into(occurrence::table)
        .values(occurrences)
        .execute(conn)
        .await
}

/// ## Summary
/// Updates an occurrence's mutable fields and returns the affected row count.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn update(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    changes: &OccurrenceChangeset,
) -> QueryResult<usize> {
    diesel::update(occurrence::table.filter(occurrence::id.eq(id)))
        .set(changes)
        .execute(conn)
        .await
}

/// ## Summary
/// Deletes occurrences by ID.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn delete_by_ids(conn: &mut DbConnection<'_>, ids: &[Uuid]) -> QueryResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    diesel::delete(occurrence::table.filter(occurrence::id.eq_any(ids)))
        .execute(conn)
        .await
}
