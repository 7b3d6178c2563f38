//! Error types for the PostgreSQL token store.

use oauth2_store::StoreError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "unique violation" (23505).
pub fn is_unique_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNIQUE_VIOLATION)
}

/// Maps a driver error into the store taxonomy.
///
/// Unique violations become `ConstraintViolation`; everything else is a
/// `Connection` error carrying the driver message unchanged.
pub fn map_sqlx_error(err: SqlxError) -> StoreError {
    if is_unique_violation(&err)
        && let SqlxError::Database(ref db_err) = err
    {
        let constraint = db_err.constraint().unwrap_or("unique constraint");
        return StoreError::constraint_violation(format!(
            "{}: {}",
            constraint,
            db_err.message()
        ));
    }
    StoreError::connection(err.to_string())
}

/// Errors raised while setting up the PostgreSQL token store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => map_sqlx_error(e),
            PostgresError::Config { message } => {
                StoreError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL setup operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
