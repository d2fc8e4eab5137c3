//! Query composition for `event`.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::event;
use crate::model::event::{Event, NewEvent};

/// ## Summary
/// Returns a query to select all events.
#[must_use]
pub fn all() -> event::BoxedQuery<'static, diesel::pg::Pg> {
    event::table.into_boxed()
}

/// ## Summary
/// Returns a query to find an event by ID.
#[must_use]
pub fn by_id(id: Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::id.eq(id))
}

/// ## Summary
/// Returns a query to find the variations derived from an event.
#[must_use]
pub fn derived_from(id: Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::derived_from_id.eq(id))
}

/// ## Summary
/// Loads an event by ID.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Event>> {
    by_id(id)
        .select(Event::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Loads every event ID in creation order.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn ids(conn: &mut DbConnection<'_>) -> QueryResult<Vec<Uuid>> {
    all()
        .order(event::created_at.asc())
        .then_order_by(event::id.asc())
        .select(event::id)
        .load(conn)
        .await
}

/// ## Summary
/// Inserts multiple events in a batch.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert_batch(conn: &mut DbConnection<'_>, events: &[NewEvent]) -> QueryResult<usize> {
    if events.is_empty() {
        return Ok(0);
    }

    diesel::insert_into(event::table)
        .values(events)
        .execute(conn)
        .await
}
