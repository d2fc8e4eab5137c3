//! Query composition for `event_repeats_generator`.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::event_repeats_generator;
use crate::model::generator::{Generator, GeneratorChangeset, NewGenerator};

/// ## Summary
/// Returns a query to select all generators.
#[must_use]
pub fn all() -> event_repeats_generator::BoxedQuery<'static, diesel::pg::Pg> {
    event_repeats_generator::table.into_boxed()
}

/// ## Summary
/// Returns a query to find a generator by ID.
#[must_use]
pub fn by_id(id: Uuid) -> event_repeats_generator::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event_repeats_generator::id.eq(id))
}

/// ## Summary
/// Returns a query to find an event's generators, earliest first.
#[must_use]
pub fn by_event(event_id: Uuid) -> event_repeats_generator::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(event_repeats_generator::event_id.eq(event_id))
        .order((
            event_repeats_generator::start_utc.asc(),
            event_repeats_generator::id.asc(),
        ))
}

/// ## Summary
/// Loads a generator by ID.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Generator>> {
    by_id(id)
        .select(Generator::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Loads an event's generators.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn load_by_event(
    conn: &mut DbConnection<'_>,
    event_id: Uuid,
) -> QueryResult<Vec<Generator>> {
    by_event(event_id)
        .select(Generator::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Inserts multiple generators in a batch.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert_batch(
    conn: &mut DbConnection<'_>,
    generators: &[NewGenerator],
) -> QueryResult<usize> {
    if generators.is_empty() {
        return Ok(0);
    }

    diesel::insert_into(event_repeats_generator::table)
        .values(generators)
        .execute(conn)
        .await
}

/// ## Summary
/// Updates a generator's mutable fields and returns the affected row count.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn update(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    changes: &GeneratorChangeset,
) -> QueryResult<usize> {
    diesel::update(event_repeats_generator::table.filter(event_repeats_generator::id.eq(id)))
        .set(changes)
        .execute(conn)
        .await
}

/// ## Summary
/// Deletes generators by ID. Their occurrences keep existing with a null
/// generator reference.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn delete_by_ids(conn: &mut DbConnection<'_>, ids: &[Uuid]) -> QueryResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    diesel::delete(event_repeats_generator::table.filter(event_repeats_generator::id.eq_any(ids)))
        .execute(conn)
        .await
}
