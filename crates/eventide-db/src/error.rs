use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Missing {table} row: {id}")]
    MissingRow {
        table: &'static str,
        id: uuid::Uuid,
    },

    #[error("Duplicate {table} row: {id}")]
    DuplicateRow {
        table: &'static str,
        id: uuid::Uuid,
    },

    #[error("Migration error: {0}")]
    MigrationError(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
