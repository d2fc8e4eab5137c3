pub mod rrule;
pub mod time;
