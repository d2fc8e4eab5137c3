//! Recurrence rule text, complete rule specs and their evaluation.

mod set;
mod spec;
mod text;

pub use set::RecurrenceSet;
pub use spec::{RuleSpec, format_ical_datetime};
pub use text::RuleText;
