//! Token record storage.
//!
//! One row per issued token pair, looked up by access or refresh value.
//! Each operation is a single statement; nothing spans a transaction.

use std::time::Duration;

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use oauth2_store::storage::{validate_key, validate_record};
use oauth2_store::{StoreError, StoreResult, TokenRecord};

use crate::PgPool;
use crate::error::map_sqlx_error;
use crate::schema::TokenSchema;

// =============================================================================
// Types
// =============================================================================

/// Raw column tuple, in `schema::COLUMNS` order.
type RowTuple = (
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    OffsetDateTime,
    i64,
    Option<String>,
    Option<OffsetDateTime>,
    Option<i64>,
);

/// Token row from the database.
///
/// Mirrors the table columns; lifetimes are raw microsecond counts.
#[derive(Debug, Clone)]
pub struct TokenRow {
    /// Client the token was issued to
    pub client_id: String,
    /// Resource owner, if any
    pub user_id: Option<String>,
    /// Redirect URI used during authorization
    pub redirect_uri: Option<String>,
    /// Granted scopes (space-separated)
    pub scope: String,
    /// Access token value (primary key)
    pub access: String,
    /// Access token issue time
    pub access_create_at: OffsetDateTime,
    /// Access token lifetime in microseconds
    pub access_expires_in: i64,
    /// Refresh token value
    pub refresh: Option<String>,
    /// Refresh token issue time
    pub refresh_create_at: Option<OffsetDateTime>,
    /// Refresh token lifetime in microseconds
    pub refresh_expires_in: Option<i64>,
}

impl TokenRow {
    /// Create from database tuple.
    fn from_tuple(row: RowTuple) -> Self {
        Self {
            client_id: row.0,
            user_id: row.1,
            redirect_uri: row.2,
            scope: row.3,
            access: row.4,
            access_create_at: row.5,
            access_expires_in: row.6,
            refresh: row.7,
            refresh_create_at: row.8,
            refresh_expires_in: row.9,
        }
    }

    /// Convert into the domain record.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a stored lifetime is negative.
    pub fn into_record(self) -> StoreResult<TokenRecord> {
        Ok(TokenRecord {
            client_id: self.client_id,
            user_id: self.user_id,
            redirect_uri: self.redirect_uri,
            scope: self.scope,
            access: self.access,
            access_create_at: self.access_create_at,
            access_expires_in: micros_to_duration(self.access_expires_in)?,
            refresh: self.refresh,
            refresh_create_at: self.refresh_create_at,
            refresh_expires_in: self
                .refresh_expires_in
                .map(micros_to_duration)
                .transpose()?,
        })
    }
}

fn micros_to_duration(micros: i64) -> StoreResult<Duration> {
    u64::try_from(micros)
        .map(Duration::from_micros)
        .map_err(|_| {
            StoreError::internal(format!("negative token lifetime in database: {micros}us"))
        })
}

/// Whole microseconds. `validate_record` has already bounded the value by
/// `MAX_LIFETIME`, so the saturation never triggers for accepted records.
fn duration_to_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

// =============================================================================
// Token Storage
// =============================================================================

/// Token storage operations.
///
/// Borrows the pool and the rendered statements for one table.
pub struct TokenStorage<'a> {
    pool: &'a PgPool,
    schema: &'a TokenSchema,
}

impl<'a> TokenStorage<'a> {
    /// Create a new token storage over `schema`'s table.
    #[must_use]
    pub fn new(pool: &'a PgPool, schema: &'a TokenSchema) -> Self {
        Self { pool, schema }
    }

    /// Insert a new token record.
    ///
    /// Lifetimes are stored as microsecond counts.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` if the access or refresh token already
    /// exists, `InvalidInput` for empty keys or sub-microsecond values,
    /// `Connection` otherwise.
    #[instrument(skip_all, fields(table = %self.schema.table(), client_id = %record.client_id))]
    pub async fn create(&self, record: &TokenRecord) -> StoreResult<()> {
        validate_record(record)?;

        query(self.schema.insert_sql())
            .bind(&record.client_id)
            .bind(&record.user_id)
            .bind(&record.redirect_uri)
            .bind(&record.scope)
            .bind(&record.access)
            .bind(record.access_create_at)
            .bind(duration_to_micros(record.access_expires_in))
            .bind(&record.refresh)
            .bind(record.refresh_create_at)
            .bind(record.refresh_expires_in.map(duration_to_micros))
            .execute(self.pool)
            .await
            .map_err(|e| {
                let err = map_sqlx_error(e);
                if err.is_constraint_violation() {
                    warn!(error = %err, "Token record rejected");
                }
                err
            })?;

        debug!(has_refresh = record.has_refresh(), "Token record stored");
        Ok(())
    }

    /// Find a row by access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn find_by_access(&self, access: &str) -> StoreResult<Option<TokenRow>> {
        let row: Option<RowTuple> = query_as(self.schema.select_by_access_sql())
            .bind(access)
            .fetch_optional(self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TokenRow::from_tuple))
    }

    /// Find a row by refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn find_by_refresh(&self, refresh: &str) -> StoreResult<Option<TokenRow>> {
        let row: Option<RowTuple> = query_as(self.schema.select_by_refresh_sql())
            .bind(refresh)
            .fetch_optional(self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TokenRow::from_tuple))
    }

    /// Get the record holding this access token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row matches.
    pub async fn get_by_access(&self, access: &str) -> StoreResult<TokenRecord> {
        validate_key("access", access)?;

        self.find_by_access(access)
            .await?
            .ok_or_else(|| StoreError::not_found("token with given access"))?
            .into_record()
    }

    /// Get the record holding this refresh token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row matches.
    pub async fn get_by_refresh(&self, refresh: &str) -> StoreResult<TokenRecord> {
        validate_key("refresh", refresh)?;

        self.find_by_refresh(refresh)
            .await?
            .ok_or_else(|| StoreError::not_found("token with given refresh"))?
            .into_record()
    }

    /// Delete the row holding this access token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row was deleted.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn delete_by_access(&self, access: &str) -> StoreResult<()> {
        validate_key("access", access)?;

        let result = query(self.schema.delete_by_access_sql())
            .bind(access)
            .execute(self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("token with given access"));
        }

        debug!("Token record removed by access");
        Ok(())
    }

    /// Delete the row holding this refresh token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row was deleted.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn delete_by_refresh(&self, refresh: &str) -> StoreResult<()> {
        validate_key("refresh", refresh)?;

        let result = query(self.schema.delete_by_refresh_sql())
            .bind(refresh)
            .execute(self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("token with given refresh"));
        }

        debug!("Token record removed by refresh");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_store::types::MAX_LIFETIME;
    use time::macros::datetime;

    fn row() -> TokenRow {
        TokenRow {
            client_id: "client-1".into(),
            user_id: Some("user-1".into()),
            redirect_uri: None,
            scope: "read".into(),
            access: "AT1".into(),
            access_create_at: datetime!(2024-01-01 00:00 UTC),
            access_expires_in: 1_500_000,
            refresh: Some("RT1".into()),
            refresh_create_at: Some(datetime!(2024-01-01 00:00 UTC)),
            refresh_expires_in: Some(86_400_000_000),
        }
    }

    #[test]
    fn test_row_into_record() {
        let record = row().into_record().unwrap();
        assert_eq!(record.access, "AT1");
        assert_eq!(record.access_expires_in, Duration::from_millis(1500));
        assert_eq!(record.refresh_expires_in, Some(Duration::from_secs(86400)));
        assert_eq!(record.expires_at(), datetime!(2024-01-02 00:00 UTC));
    }

    #[test]
    fn test_negative_lifetime_is_internal_error() {
        let mut bad = row();
        bad.refresh_expires_in = Some(-1);
        let err = bad.into_record().unwrap_err();
        assert!(matches!(err, StoreError::Internal { .. }));
    }

    #[test]
    fn test_duration_to_micros() {
        assert_eq!(duration_to_micros(Duration::from_millis(1500)), 1_500_000);
        assert_eq!(duration_to_micros(MAX_LIFETIME), i64::MAX);
        assert_eq!(micros_to_duration(1_500_000).unwrap(), Duration::from_millis(1500));
    }
}
