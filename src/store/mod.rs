//! Persistence layer over Postgres.
//!
//! Handlers never write SQL text for reads; they construct query arguments
//! (projection, skip/take, equality filters) and the select builder renders
//! them. Identifiers only ever come from compile-time allow-lists; values
//! only ever travel through binds.

pub mod messages;
pub mod models;
pub mod query;
pub mod users;
pub mod villages;

use thiserror::Error;

pub use models::{UserRecord, MESSAGE_FIELDS, USER_FIELDS, VILLAGE_FIELDS};
pub use users::PgAccountDirectory;

pub type Db = sqlx::PgPool;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
}

// Postgres error classes worth distinguishing
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::NotFound;
        }
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return StoreError::Unavailable(err.to_string());
        }
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::Conflict("The record already exists.".to_string());
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return StoreError::Validation(
                        "A referenced record does not exist.".to_string(),
                    );
                }
                _ => {}
            }
        }
        StoreError::Sqlx(err)
    }
}
