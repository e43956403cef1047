//! Embedded SQLite persistence for the planning tables.

pub mod migrations;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::planning::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("failed to create database directory: {0}")]
    CreateDir(std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RepositoryError::Conflict
            }
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}
