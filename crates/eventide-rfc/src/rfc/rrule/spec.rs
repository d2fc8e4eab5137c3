use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};

use super::text::RuleText;

/// ## Summary
/// Formats a naive local date-time as an iCalendar `DATE-TIME` value.
///
/// Local wall-clock values are written with the UTC designator so the
/// evaluator applies no zone offset; sub-second precision is dropped.
#[must_use]
pub fn format_ical_datetime(value: NaiveDateTime) -> String {
    value.format("%Y%m%dT%H%M%SZ").to_string()
}

/// A complete rule spec: `DTSTART` anchor, rule text and optional `UNTIL`.
///
/// Without rule text the spec is a single `RDATE` at the anchor.
#[derive(Debug, Clone)]
pub struct RuleSpec<'a> {
    dtstart: NaiveDateTime,
    rule: Option<&'a RuleText>,
    until: Option<NaiveDateTime>,
}

impl<'a> RuleSpec<'a> {
    #[must_use]
    pub fn new(dtstart: NaiveDateTime, rule: Option<&'a RuleText>) -> Self {
        Self {
            dtstart,
            rule,
            until: None,
        }
    }

    /// ## Summary
    /// Bounds the rule so that `bound` itself is excluded.
    ///
    /// `UNTIL` is inclusive, so the stored value is one microsecond earlier.
    /// For all-day rules callers pass the day after the last included day,
    /// which makes `UNTIL` the last instant of that day.
    #[must_use]
    pub fn with_exclusive_until(mut self, bound: NaiveDateTime) -> Self {
        self.until = Some(bound - TimeDelta::microseconds(1));
        self
    }

    #[must_use]
    pub fn dtstart(&self) -> NaiveDateTime {
        self.dtstart
    }

    #[must_use]
    pub fn until(&self) -> Option<NaiveDateTime> {
        self.until
    }
}

impl fmt::Display for RuleSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DTSTART:{}", format_ical_datetime(self.dtstart))?;
        match self.rule {
            Some(rule) => {
                write!(f, "\nRRULE:{rule}")?;
                // COUNT and UNTIL are mutually exclusive in RFC 5545
                if let Some(until) = self.until
                    && !rule.has_terminator()
                {
                    write!(f, ";UNTIL={}", format_ical_datetime(until))?;
                }
                Ok(())
            }
            None => write!(f, "\nRDATE:{}", format_ical_datetime(self.dtstart)),
        }
    }
}
