//! Named, reusable recurrence rules.

use eventide_db::db::store::TimelineStore;
use eventide_db::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};
use eventide_rfc::rfc::rrule::RuleText;

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Returns the rule text stored under `description`.
///
/// ## Errors
/// Returns `ServiceError::NotFound` if no rule has that description.
#[tracing::instrument(skip(store))]
pub async fn get_rule<S: TimelineStore>(store: &S, description: &str) -> ServiceResult<RuleText> {
    let rule = store
        .recurrence_rule_by_description(description)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("recurrence rule {description:?}")))?;
    Ok(RuleText::parse(&rule.rule_text)?)
}

/// ## Summary
/// Looks a catalog entry up by its rule text.
///
/// ## Errors
/// Returns an error if the store cannot be read.
pub async fn rule_by_text<S: TimelineStore>(
    store: &S,
    rule_text: &str,
) -> ServiceResult<Option<RecurrenceRule>> {
    Ok(store.recurrence_rule_by_text(rule_text).await?)
}

/// ## Summary
/// Adds a rule to the catalog.
///
/// ## Errors
/// Returns `ServiceError::ValidationError` if the description is blank, the
/// rule text does not parse, or either is already in the catalog.
#[tracing::instrument(skip(store))]
pub async fn create_rule<S: TimelineStore>(
    store: &S,
    description: &str,
    rule_text: &str,
) -> ServiceResult<RecurrenceRule> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ServiceError::ValidationError(
            "Recurrence rule description must not be empty".to_string(),
        ));
    }
    let rule = RuleText::parse(rule_text)
        .map_err(|err| ServiceError::ValidationError(err.to_string()))?;

    if store
        .recurrence_rule_by_description(description)
        .await?
        .is_some()
    {
        return Err(ServiceError::ValidationError(format!(
            "Recurrence rule with description {description:?} already exists"
        )));
    }
    if store.recurrence_rule_by_text(rule.as_str()).await?.is_some() {
        return Err(ServiceError::ValidationError(format!(
            "Recurrence rule {rule} already exists"
        )));
    }

    Ok(store
        .create_recurrence_rule(NewRecurrenceRule::new(description, rule.as_str()))
        .await?)
}
