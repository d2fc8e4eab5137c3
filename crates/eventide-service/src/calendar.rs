//! The capability every calendar-visible event type provides.

use eventide_core::constants::EVENTS_ROUTE_PREFIX;
use eventide_db::model::event::Event;
use eventide_db::model::occurrence::Occurrence;

/// Event fields a variation may copy from the event it splits off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneableField {
    Title,
    ShowInCalendar,
    PartOf,
}

pub const DEFAULT_CLONEABLE_FIELDS: &[CloneableField] = &[
    CloneableField::Title,
    CloneableField::ShowInCalendar,
    CloneableField::PartOf,
];

/// An event type shown on the calendar.
///
/// Variant types compose their own fields alongside the shared [`Event`]
/// core and expose it through [`CalendarEvent::core`].
pub trait CalendarEvent {
    fn core(&self) -> &Event;

    #[must_use]
    fn absolute_url(&self) -> String {
        format!("{EVENTS_ROUTE_PREFIX}/{}/", self.core().slug)
    }

    /// ## Summary
    /// Returns the URL for one occurrence; defaults to the event's own URL.
    #[must_use]
    fn occurrence_url(&self, _occurrence: &Occurrence) -> String {
        self.absolute_url()
    }

    #[must_use]
    fn cloneable_fields(&self) -> &'static [CloneableField] {
        DEFAULT_CLONEABLE_FIELDS
    }
}

impl CalendarEvent for Event {
    fn core(&self) -> &Event {
        self
    }
}
