//! Models for the event table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::event;

/// An event that owns generators and occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = event)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    /// Parent event whose timeline is inherited while this event has no
    /// occurrences of its own.
    pub part_of_id: Option<Uuid>,
    /// Event this one was cloned from as a variation.
    pub derived_from_id: Option<Uuid>,
    pub show_in_calendar: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New event for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = event)]
pub struct NewEvent {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub part_of_id: Option<Uuid>,
    pub derived_from_id: Option<Uuid>,
    pub show_in_calendar: bool,
}

impl NewEvent {
    /// ## Summary
    /// Creates a new top-level event with a fresh identifier.
    #[must_use]
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            slug: slug.into(),
            part_of_id: None,
            derived_from_id: None,
            show_in_calendar: true,
        }
    }

    /// ## Summary
    /// Builds the stored row, stamping both timestamps with `now`.
    #[must_use]
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: self.id,
            title: self.title,
            slug: self.slug,
            part_of_id: self.part_of_id,
            derived_from_id: self.derived_from_id,
            show_in_calendar: self.show_in_calendar,
            created_at: now,
            updated_at: now,
        }
    }
}
