//! Recurrence generators: validation, normalization and expansion.

mod expand;

pub use expand::{OccurrenceSlot, first_slot_on_or_after, generate, slots_before};

use chrono::{DateTime, SubsecRound, Utc};
use eventide_db::model::generator::{Generator, NewGenerator};
use eventide_rfc::rfc::rrule::RuleText;
use eventide_rfc::rfc::time;
use uuid::Uuid;

use crate::context::ExpansionContext;
use crate::error::{ServiceError, ServiceResult};

/// Caller-supplied generator fields, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInput {
    pub rule_text: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub repeat_end: Option<DateTime<Utc>>,
}

impl GeneratorInput {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            rule_text: None,
            start,
            end,
            is_all_day: false,
            repeat_end: None,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule_text: impl Into<String>) -> Self {
        self.rule_text = Some(rule_text.into());
        self
    }

    #[must_use]
    pub fn with_repeat_end(mut self, repeat_end: DateTime<Utc>) -> Self {
        self.repeat_end = Some(repeat_end);
        self
    }

    #[must_use]
    pub fn all_day(mut self) -> Self {
        self.is_all_day = true;
        self
    }

    /// ## Summary
    /// Validates the fields and returns them in stored form.
    ///
    /// Rule text is reduced to the bare `RRULE` value, the start is
    /// truncated to whole seconds and all-day bounds are moved to the start
    /// of the first day and the last instant of the final day.
    ///
    /// ## Errors
    /// Returns `ServiceError::ValidationError` for any violated invariant.
    pub fn normalize(&self, ctx: &ExpansionContext) -> ServiceResult<ValidGenerator> {
        let rule = match self.rule_text.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                RuleText::parse(text).map_err(|e| ServiceError::ValidationError(e.to_string()))?,
            ),
        };

        if self.end < self.start {
            return Err(ServiceError::ValidationError(format!(
                "End date/time must be after or equal to start date/time: {} < {}",
                self.end, self.start
            )));
        }

        if let Some(repeat_end) = self.repeat_end {
            if rule.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Recurrence rule must be set if a repeat end date/time is set: {repeat_end}"
                )));
            }
            if repeat_end < self.start {
                return Err(ServiceError::ValidationError(format!(
                    "Repeat end date/time must be after or equal to start date/time: {} < {}",
                    repeat_end, self.start
                )));
            }
        }

        let local_start = ctx.to_local(self.start);
        if self.is_all_day && !time::is_day_boundary(local_start) {
            return Err(ServiceError::ValidationError(format!(
                "Start date/time must be at 00:00:00 hours/minutes/seconds for all-day generators: {local_start}"
            )));
        }

        let (start, end) = if self.is_all_day {
            (
                ctx.from_local(time::start_of_day(local_start))?,
                ctx.from_local(time::last_instant_of_day(ctx.to_local(self.end)))?,
            )
        } else {
            (self.start.trunc_subsecs(0), self.end)
        };

        Ok(ValidGenerator {
            rule,
            start,
            end,
            is_all_day: self.is_all_day,
            repeat_end: self.repeat_end,
        })
    }
}

impl From<&Generator> for GeneratorInput {
    fn from(generator: &Generator) -> Self {
        Self {
            rule_text: generator.rule_text.clone(),
            start: generator.start_utc,
            end: generator.end_utc,
            is_all_day: generator.is_all_day,
            repeat_end: generator.repeat_end_utc,
        }
    }
}

/// Generator fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidGenerator {
    pub rule: Option<RuleText>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub repeat_end: Option<DateTime<Utc>>,
}

impl ValidGenerator {
    #[must_use]
    pub fn into_new(self, id: Uuid, event_id: Uuid) -> NewGenerator {
        NewGenerator {
            id,
            event_id,
            rule_text: self.rule.map(|rule| rule.as_str().to_string()),
            start_utc: self.start,
            end_utc: self.end,
            is_all_day: self.is_all_day,
            repeat_end_utc: self.repeat_end,
        }
    }

    /// ## Summary
    /// Writes the validated fields over a stored generator.
    pub fn apply_to(self, generator: &mut Generator) {
        generator.rule_text = self.rule.map(|rule| rule.as_str().to_string());
        generator.start_utc = self.start;
        generator.end_utc = self.end;
        generator.is_all_day = self.is_all_day;
        generator.repeat_end_utc = self.repeat_end;
    }
}
