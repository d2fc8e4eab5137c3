use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] eventide_db::error::DbError),

    #[error(transparent)]
    RfcError(#[from] eventide_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] eventide_core::error::CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Domain invariant violated: {0}")]
    DomainInvariant(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
