use std::fmt;
use std::str::FromStr;

use rrule::{RRule, Unvalidated};

use crate::error::{RfcError, RfcResult};

/// A validated `RRULE` value such as `FREQ=WEEKLY;BYDAY=MO,WE`.
///
/// The `RRULE:` property prefix is accepted on input and stripped, so the
/// stored text is always the bare rule value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleText(String);

impl RuleText {
    /// ## Summary
    /// Parses and validates recurrence rule text.
    ///
    /// ## Errors
    /// Returns `RfcError::ParseError` if the text is empty, spans several
    /// lines, or is not a valid `RRULE` value.
    pub fn parse(text: &str) -> RfcResult<Self> {
        let trimmed = text.trim();
        let body = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => trimmed[6..].trim(),
            _ => trimmed,
        };

        if body.is_empty() {
            return Err(RfcError::ParseError("recurrence rule is empty".to_string()));
        }
        if body.contains(['\n', '\r']) {
            return Err(RfcError::ParseError(format!(
                "recurrence rule must be a single RRULE value: {body:?}"
            )));
        }

        body.parse::<RRule<Unvalidated>>().map_err(|err| {
            RfcError::ParseError(format!("invalid recurrence rule {body:?}: {err}"))
        })?;

        Ok(Self(body.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ## Summary
    /// Returns true when the rule carries its own `COUNT` or `UNTIL`.
    #[must_use]
    pub fn has_terminator(&self) -> bool {
        self.parts()
            .any(|(key, _)| key.eq_ignore_ascii_case("COUNT") || key.eq_ignore_ascii_case("UNTIL"))
    }

    /// ## Summary
    /// Returns the rule's `COUNT`, if it has one.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        self.parts()
            .find(|(key, _)| key.eq_ignore_ascii_case("COUNT"))
            .and_then(|(_, value)| value.parse().ok())
    }

    /// ## Summary
    /// Returns the same rule with its `COUNT` replaced by `count`.
    ///
    /// A rule without `COUNT` is returned unchanged.
    #[must_use]
    pub fn with_count(&self, count: u32) -> Self {
        let body = self
            .0
            .split(';')
            .map(|part| match part.split_once('=') {
                Some((key, _)) if key.trim().eq_ignore_ascii_case("COUNT") => {
                    format!("COUNT={count}")
                }
                _ => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";");
        Self(body)
    }

    fn parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .split(';')
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
    }
}

impl fmt::Display for RuleText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RuleText {
    type Err = RfcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
