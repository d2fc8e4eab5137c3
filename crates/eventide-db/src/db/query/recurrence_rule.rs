//! Query composition for `recurrence_rule`.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::recurrence_rule;
use crate::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};

/// ## Summary
/// Returns a query to select all catalog rules.
#[must_use]
pub fn all() -> recurrence_rule::BoxedQuery<'static, diesel::pg::Pg> {
    recurrence_rule::table.into_boxed()
}

/// ## Summary
/// Returns a query to find a rule by its description.
#[must_use]
pub fn by_description(description: &str) -> recurrence_rule::BoxedQuery<'_, diesel::pg::Pg> {
    recurrence_rule::table
        .filter(recurrence_rule::description.eq(description))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find a rule by its rule text.
#[must_use]
pub fn by_rule_text(rule_text: &str) -> recurrence_rule::BoxedQuery<'_, diesel::pg::Pg> {
    recurrence_rule::table
        .filter(recurrence_rule::rule_text.eq(rule_text))
        .into_boxed()
}

/// ## Summary
/// Loads the first row of a rule lookup.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn first(
    conn: &mut DbConnection<'_>,
    query: recurrence_rule::BoxedQuery<'_, diesel::pg::Pg>,
) -> QueryResult<Option<RecurrenceRule>> {
    query
        .select(RecurrenceRule::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts a catalog rule and returns the stored row.
///
/// ## Errors
/// Returns an error if the database operation fails, including unique
/// violations on description or rule text.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    rule: &NewRecurrenceRule,
) -> QueryResult<RecurrenceRule> {
    diesel::insert_into(recurrence_rule::table)
        .values(rule)
        .returning(RecurrenceRule::as_returning())
        .get_result(conn)
        .await
}
