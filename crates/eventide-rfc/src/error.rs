use chrono::NaiveDateTime;
use thiserror::Error;

/// Recurrence rule parsing and evaluation errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Local time {local} does not exist in {tzid}")]
    NonExistentTime { local: NaiveDateTime, tzid: String },
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
