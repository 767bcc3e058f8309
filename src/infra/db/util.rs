use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

// Postgres SQLSTATE codes the repositories distinguish.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const CHECK_VIOLATION: &str = "23514";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const QUERY_CANCELED: &str = "57014";

/// Translate a sqlx failure into the repository error taxonomy.
///
/// Unique violations surface the constraint name so callers can tell a
/// duplicate username (`users_username_key`) or group slug
/// (`groups_slug_key`) from a re-inserted follow pair (`follows_pkey`).
/// Foreign-key violations come from writes against a deleted post,
/// author, or group and map to invalid input rather than a server
/// fault.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    match db.code().as_deref() {
        Some(UNIQUE_VIOLATION) => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        Some(FOREIGN_KEY_VIOLATION) | Some(INVALID_TEXT_REPRESENTATION) => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        Some(NOT_NULL_VIOLATION) | Some(CHECK_VIOLATION) => RepoError::Integrity {
            message: db.message().to_string(),
        },
        Some(QUERY_CANCELED) => RepoError::Timeout,
        _ => RepoError::from_persistence(db.message()),
    }
}
