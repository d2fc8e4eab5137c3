use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use eventide_db::model::generator::Generator;
use eventide_rfc::rfc::rrule::{RecurrenceSet, RuleSpec, RuleText};
use eventide_rfc::rfc::time;

use crate::context::ExpansionContext;
use crate::error::ServiceResult;

/// One `(start, end)` pair produced by a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OccurrenceSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// ## Summary
/// Expands a generator into its occurrence slots, earliest first.
///
/// The upper bound is the generator's repeat end, else `until`, else
/// `now + repeat_limit`; it is exclusive, and all-day generators extend it
/// to the end of the bound's day. Arithmetic happens on local wall-clock
/// values so every slot keeps the first occurrence's local time of day and
/// local duration. A generator without rule text yields its own bounds.
/// Zero-duration generators yield slots one day long.
///
/// ## Errors
/// Returns an error if the stored rule text no longer parses or the rule
/// evaluator rejects the spec.
#[tracing::instrument(skip(generator, ctx), fields(generator_id = %generator.id))]
pub fn generate(
    generator: &Generator,
    until: Option<DateTime<Utc>>,
    ctx: &ExpansionContext,
) -> ServiceResult<Vec<OccurrenceSlot>> {
    let Some(rule_text) = generator.rule_text.as_deref() else {
        return Ok(vec![single_slot(generator, ctx)?]);
    };
    let rule = RuleText::parse(rule_text)?;

    let bound = generator
        .repeat_end_utc
        .or(until)
        .unwrap_or(ctx.now + ctx.repeat_limit);

    expand_between(generator, &rule, generator.start_utc, bound, ctx)
}

/// ## Summary
/// Returns the first slot of a generator starting at or after `point`.
///
/// Rules without an end are searched up to `point` plus the larger of the
/// repeat limit and one year.
///
/// ## Errors
/// Returns an error if the rule cannot be evaluated.
pub fn first_slot_on_or_after(
    generator: &Generator,
    point: DateTime<Utc>,
    ctx: &ExpansionContext,
) -> ServiceResult<Option<OccurrenceSlot>> {
    let Some(rule_text) = generator.rule_text.as_deref() else {
        return if generator.start_utc >= point {
            single_slot(generator, ctx).map(Some)
        } else {
            Ok(None)
        };
    };
    let rule = RuleText::parse(rule_text)?;

    let search = ctx.repeat_limit.max(TimeDelta::days(366));
    let bound = generator.repeat_end_utc.unwrap_or(point + search);
    let from = generator.start_utc.max(point);

    Ok(expand_between(generator, &rule, from, bound, ctx)?
        .into_iter()
        .find(|slot| slot.start >= point))
}

/// ## Summary
/// Counts the slots of a generator that start before `point`.
///
/// ## Errors
/// Returns an error if the rule cannot be evaluated.
pub fn slots_before(
    generator: &Generator,
    point: DateTime<Utc>,
    ctx: &ExpansionContext,
) -> ServiceResult<usize> {
    let Some(rule_text) = generator.rule_text.as_deref() else {
        return Ok(usize::from(generator.start_utc < point));
    };
    let rule = RuleText::parse(rule_text)?;

    Ok(expand_between(generator, &rule, generator.start_utc, point, ctx)?
        .iter()
        .filter(|slot| slot.start < point)
        .count())
}

/// Local length of every slot.
fn slot_duration(generator: &Generator, ctx: &ExpansionContext) -> TimeDelta {
    let duration = ctx.to_local(generator.end_utc) - ctx.to_local(generator.start_utc);
    if duration.is_zero() {
        TimeDelta::days(1)
    } else {
        duration
    }
}

fn single_slot(generator: &Generator, ctx: &ExpansionContext) -> ServiceResult<OccurrenceSlot> {
    let end = if generator.end_utc > generator.start_utc {
        generator.end_utc
    } else {
        ctx.from_local(ctx.to_local(generator.start_utc) + slot_duration(generator, ctx))?
    };
    Ok(OccurrenceSlot {
        start: generator.start_utc,
        end,
    })
}

fn expand_between(
    generator: &Generator,
    rule: &RuleText,
    from: DateTime<Utc>,
    bound: DateTime<Utc>,
    ctx: &ExpansionContext,
) -> ServiceResult<Vec<OccurrenceSlot>> {
    let start_local = ctx.to_local(generator.start_utc);
    let duration = slot_duration(generator, ctx);

    let mut bound_local = ctx.to_local(bound);
    if generator.is_all_day {
        bound_local = time::start_of_day(bound_local) + TimeDelta::days(1);
    }
    if bound_local <= start_local {
        return Ok(Vec::new());
    }

    let spec = RuleSpec::new(start_local, Some(rule)).with_exclusive_until(bound_local);
    let set = RecurrenceSet::parse(&spec.to_string())?;

    // `between` excludes its lower bound
    let lower: NaiveDateTime = ctx.to_local(from) - TimeDelta::microseconds(1);
    let starts = set.between(lower, bound_local);

    tracing::debug!(count = starts.len(), "Expanded generator");

    starts
        .into_iter()
        .map(|local| {
            Ok(OccurrenceSlot {
                start: ctx.from_local(local)?,
                end: ctx.from_local(local + duration)?,
            })
        })
        .collect()
}
