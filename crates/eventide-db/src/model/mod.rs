pub mod event;
pub mod generator;
pub mod occurrence;
pub mod recurrence_rule;
