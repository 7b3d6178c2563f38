//! Token store trait.
//!
//! This module defines the storage interface the authorization server uses to
//! persist issued tokens and to resolve them again on introspection, refresh
//! and revocation.

use async_trait::async_trait;

use crate::types::TokenRecord;
use crate::{StoreError, StoreResult};

/// Storage trait for token records.
///
/// Records are keyed twice: by access token (always present) and by refresh
/// token (when issued). Both keys are unique across live records.
///
/// Each method is one independent operation against the backend. Nothing is
/// cached between calls and failures are never retried; every error goes
/// back to the caller unchanged.
///
/// # Implementations
///
/// - [`crate::memory::MemoryTokenStore`] - in-process, non-persistent
/// - `oauth2-store-postgres` - PostgreSQL storage backend
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a newly issued token record.
    ///
    /// # Errors
    ///
    /// - `ConstraintViolation` if the access or refresh token already exists
    /// - `InvalidInput` if the access token, or a present refresh token, is
    ///   empty, or a timestamp or lifetime is finer than a microsecond
    /// - `Connection` if the backend is unavailable
    async fn create(&self, record: &TokenRecord) -> StoreResult<()>;

    /// Deletes the record holding this access token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches; nothing is removed.
    async fn remove_by_access(&self, access: &str) -> StoreResult<()>;

    /// Deletes the record holding this refresh token.
    ///
    /// The whole record goes, including its access token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches; nothing is removed.
    async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()>;

    /// Finds the record holding this access token.
    ///
    /// Expired records are returned as-is; callers check
    /// [`TokenRecord::is_expired`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches.
    async fn get_by_access(&self, access: &str) -> StoreResult<TokenRecord>;

    /// Finds the record holding this refresh token.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record matches.
    async fn get_by_refresh(&self, refresh: &str) -> StoreResult<TokenRecord>;
}

/// Checks a record before it is written.
///
/// # Errors
///
/// Returns `InvalidInput` if the access token is empty, if a refresh token
/// is present but empty, or if a timestamp or lifetime cannot be stored
/// without loss (see [`TokenRecord::is_storable`]).
pub fn validate_record(record: &TokenRecord) -> StoreResult<()> {
    if record.access.is_empty() {
        return Err(StoreError::invalid_input("access token cannot be empty"));
    }
    if record.refresh.as_deref() == Some("") {
        return Err(StoreError::invalid_input(
            "refresh token cannot be empty when present",
        ));
    }
    if !record.is_storable() {
        return Err(StoreError::invalid_input(
            "timestamps and lifetimes must be whole microseconds within MAX_LIFETIME",
        ));
    }
    Ok(())
}

/// Checks a lookup key.
///
/// An empty key can never match a stored record, so it is reported as
/// `NotFound` without consulting the backend.
///
/// # Errors
///
/// Returns `NotFound` if `value` is empty.
pub fn validate_key(kind: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::not_found(format!("token with empty {kind}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    fn record(access: &str) -> TokenRecord {
        TokenRecord::new(
            access,
            "client-1",
            "read",
            datetime!(2024-01-01 00:00 UTC),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_validate_record() {
        assert!(validate_record(&record("AT1")).is_ok());

        let err = validate_record(&record("")).unwrap_err();
        assert!(err.is_invalid_input());

        let empty_refresh =
            record("AT1").with_refresh("", datetime!(2024-01-01 00:00 UTC), Duration::ZERO);
        let err = validate_record(&empty_refresh).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("refresh"));
    }

    #[test]
    fn test_validate_record_rejects_lossy_precision() {
        let mut nanos = record("AT1");
        nanos.access_expires_in = Duration::from_nanos(1_500_000_001);
        let err = validate_record(&nanos).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("microseconds"));

        let mut nanos = record("AT1");
        nanos.access_create_at = datetime!(2024-01-01 00:00:00.000000001 UTC);
        assert!(validate_record(&nanos).unwrap_err().is_invalid_input());

        // Built through the constructor, the same inputs are truncated and accepted.
        let truncated = TokenRecord::new(
            "AT1",
            "client-1",
            "read",
            datetime!(2024-01-01 00:00:00.000000001 UTC),
            Duration::from_nanos(1_500_000_001),
        );
        assert!(validate_record(&truncated).is_ok());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("access", "AT1").is_ok());

        let err = validate_key("refresh", "").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: token with empty refresh");
    }
}
