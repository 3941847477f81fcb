use thiserror::Error;

use crate::UserId;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("The username {0} is already taken")]
    DuplicateUsername(String),
    #[error("No user exists with id {0}")]
    AuthorNotFound(UserId),
}

impl SqliteDatabaseError {
    pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
        matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
    }
}

/// SQLite stores integers as `i64`. Ids handed out by the engine are unsigned, so they are converted on the way in.
pub(crate) fn db_id(id: u64) -> Result<i64, SqliteDatabaseError> {
    i64::try_from(id).map_err(|_| SqliteDatabaseError::QueryError(format!("Id {id} is out of range")))
}
