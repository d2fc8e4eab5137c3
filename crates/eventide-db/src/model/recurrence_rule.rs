//! Models for the recurrence rule catalog.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::recurrence_rule;

/// A named recurrence rule that editors can pick from.
///
/// Both `description` and `rule_text` are unique.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = recurrence_rule)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecurrenceRule {
    pub id: Uuid,
    pub description: String,
    pub rule_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New catalog entry for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = recurrence_rule)]
pub struct NewRecurrenceRule {
    pub id: Uuid,
    pub description: String,
    pub rule_text: String,
}

impl NewRecurrenceRule {
    #[must_use]
    pub fn new(description: impl Into<String>, rule_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            description: description.into(),
            rule_text: rule_text.into(),
        }
    }

    #[must_use]
    pub fn into_rule(self, now: DateTime<Utc>) -> RecurrenceRule {
        RecurrenceRule {
            id: self.id,
            description: self.description,
            rule_text: self.rule_text,
            created_at: now,
            updated_at: now,
        }
    }
}
