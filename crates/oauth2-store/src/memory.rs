//! In-memory token store.
//!
//! Keeps records in process memory with the same observable behaviour as the
//! database backends: unique keys, `NotFound` on misses, whole-record removal.
//! Nothing survives a restart, so this is meant for tests and local runs of
//! the authorization server.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::storage::{TokenStore, validate_key, validate_record};
use crate::types::TokenRecord;
use crate::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    /// access token -> record
    by_access: HashMap<String, TokenRecord>,
    /// refresh token -> access token
    by_refresh: HashMap<String, String>,
}

impl Tables {
    fn remove(&mut self, access: &str) -> Option<TokenRecord> {
        let record = self.by_access.remove(access)?;
        if let Some(refresh) = &record.refresh {
            self.by_refresh.remove(refresh);
        }
        Some(record)
    }
}

/// Non-persistent [`TokenStore`] backed by two hash maps.
///
/// Both maps sit behind one lock, so a create or remove updates the access
/// and refresh indexes together.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tables: RwLock<Tables>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_access.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    #[instrument(skip_all, fields(client_id = %record.client_id))]
    async fn create(&self, record: &TokenRecord) -> StoreResult<()> {
        validate_record(record)?;

        let mut tables = self.tables.write().await;
        if tables.by_access.contains_key(&record.access) {
            return Err(StoreError::constraint_violation(
                "access token already exists",
            ));
        }
        if let Some(refresh) = &record.refresh {
            if tables.by_refresh.contains_key(refresh) {
                return Err(StoreError::constraint_violation(
                    "refresh token already exists",
                ));
            }
            tables
                .by_refresh
                .insert(refresh.clone(), record.access.clone());
        }
        tables
            .by_access
            .insert(record.access.clone(), record.clone());

        debug!("Token record stored");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn remove_by_access(&self, access: &str) -> StoreResult<()> {
        validate_key("access", access)?;

        let mut tables = self.tables.write().await;
        if tables.remove(access).is_none() {
            return Err(StoreError::not_found("token with given access"));
        }

        debug!("Token record removed by access");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()> {
        validate_key("refresh", refresh)?;

        let mut tables = self.tables.write().await;
        let access = tables
            .by_refresh
            .get(refresh)
            .cloned()
            .ok_or_else(|| StoreError::not_found("token with given refresh"))?;
        tables.remove(&access);

        debug!("Token record removed by refresh");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_by_access(&self, access: &str) -> StoreResult<TokenRecord> {
        validate_key("access", access)?;

        self.tables
            .read()
            .await
            .by_access
            .get(access)
            .cloned()
            .ok_or_else(|| StoreError::not_found("token with given access"))
    }

    #[instrument(skip_all)]
    async fn get_by_refresh(&self, refresh: &str) -> StoreResult<TokenRecord> {
        validate_key("refresh", refresh)?;

        let tables = self.tables.read().await;
        tables
            .by_refresh
            .get(refresh)
            .and_then(|access| tables.by_access.get(access))
            .cloned()
            .ok_or_else(|| StoreError::not_found("token with given refresh"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use time::macros::datetime;

    const HOUR: Duration = Duration::from_secs(3600);

    fn pair(access: &str, refresh: &str) -> TokenRecord {
        TokenRecord::new(
            access,
            "client-1",
            "read write",
            datetime!(2024-01-01 00:00 UTC),
            HOUR,
        )
        .with_refresh(refresh, datetime!(2024-01-01 00:00 UTC), 24 * HOUR)
        .with_user_id("user-1")
    }

    #[tokio::test]
    async fn test_create_then_get_by_both_keys() {
        let store = MemoryTokenStore::new();
        let record = pair("AT1", "RT1");
        store.create(&record).await.unwrap();

        let by_access = store.get_by_access("AT1").await.unwrap();
        let by_refresh = store.get_by_refresh("RT1").await.unwrap();
        assert_eq!(by_access, record);
        assert_eq!(by_refresh, by_access);
    }

    #[tokio::test]
    async fn test_remove_by_refresh_deletes_whole_record() {
        let store = MemoryTokenStore::new();
        store.create(&pair("AT1", "RT1")).await.unwrap();

        store.remove_by_refresh("RT1").await.unwrap();

        assert!(store.get_by_refresh("RT1").await.unwrap_err().is_not_found());
        assert!(store.get_by_access("AT1").await.unwrap_err().is_not_found());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_by_access_frees_refresh_key() {
        let store = MemoryTokenStore::new();
        store.create(&pair("AT1", "RT1")).await.unwrap();

        store.remove_by_access("AT1").await.unwrap();
        assert!(store.get_by_access("AT1").await.unwrap_err().is_not_found());
        assert!(store.get_by_refresh("RT1").await.unwrap_err().is_not_found());

        // The refresh value can be issued again once its record is gone.
        store.create(&pair("AT2", "RT1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let store = MemoryTokenStore::new();
        store.create(&pair("AT1", "RT1")).await.unwrap();

        assert!(store.remove_by_access("nope").await.unwrap_err().is_not_found());
        assert!(store.remove_by_refresh("nope").await.unwrap_err().is_not_found());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_rejected() {
        let store = MemoryTokenStore::new();
        store.create(&pair("AT1", "RT1")).await.unwrap();

        let err = store.create(&pair("AT1", "RT2")).await.unwrap_err();
        assert!(err.is_constraint_violation());

        let err = store.create(&pair("AT2", "RT1")).await.unwrap_err();
        assert!(err.is_constraint_violation());

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_keys() {
        let store = MemoryTokenStore::new();
        let err = store.create(&pair("", "RT1")).await.unwrap_err();
        assert!(err.is_invalid_input());

        assert!(store.get_by_access("").await.unwrap_err().is_not_found());
        assert!(store.remove_by_refresh("").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_revocation_only_one_wins() {
        let store = Arc::new(MemoryTokenStore::new());
        store.create(&pair("AT1", "RT1")).await.unwrap();

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.remove_by_access("AT1").await }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.remove_by_refresh("RT1").await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(StoreError::is_not_found)
        );
    }
}
