//! `TokenStore` implementation for the Arc-owning PostgreSQL store.
//!
//! The lifetime-based [`TokenStorage`] carries the SQL; this adapter lets the
//! authorization server hold the store as `Arc<dyn TokenStore>`.

use async_trait::async_trait;

use oauth2_store::{StoreResult, TokenRecord, TokenStore};

use crate::PostgresTokenStore;
use crate::token::TokenStorage;

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn create(&self, record: &TokenRecord) -> StoreResult<()> {
        self.tokens().create(record).await
    }

    async fn remove_by_access(&self, access: &str) -> StoreResult<()> {
        self.tokens().delete_by_access(access).await
    }

    async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()> {
        self.tokens().delete_by_refresh(refresh).await
    }

    async fn get_by_access(&self, access: &str) -> StoreResult<TokenRecord> {
        self.tokens().get_by_access(access).await
    }

    async fn get_by_refresh(&self, refresh: &str) -> StoreResult<TokenRecord> {
        self.tokens().get_by_refresh(refresh).await
    }
}

impl PostgresTokenStore {
    /// Get token storage operations.
    #[must_use]
    pub fn tokens(&self) -> TokenStorage<'_> {
        TokenStorage::new(self.pool(), self.schema())
    }
}
