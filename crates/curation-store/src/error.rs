use curation_core::{CurationError, ErrorKind};

pub(crate) fn from_sqlx(e: sqlx::Error) -> CurationError {
    match &e {
        sqlx::Error::RowNotFound => CurationError::new(ErrorKind::NodeNotFound, "row not found"),
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            CurationError::new(ErrorKind::DuplicateEntry, db_err.message().to_string())
        }
        sqlx::Error::Database(db_err) => CurationError::new(
            ErrorKind::DatabaseConstraintViolation,
            db_err.message().to_string(),
        ),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            CurationError::new(ErrorKind::DatabaseConnectionError, e.to_string())
        }
        _ => CurationError::new(ErrorKind::DatabaseQueryError, e.to_string()),
    }
}
