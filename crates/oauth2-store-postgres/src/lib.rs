//! PostgreSQL token store for oauth2-store
//!
//! Persists access/refresh token records in a single table and implements
//! [`oauth2_store::TokenStore`] on top of it.
//!
//! # Example
//!
//! ```ignore
//! use oauth2_store::TokenStore;
//! use oauth2_store_postgres::{PostgresStoreConfig, PostgresTokenStore};
//!
//! let config = PostgresStoreConfig::new("localhost", 5432)
//!     .with_credentials("oauth", "secret");
//!
//! // Open the pool and create the `tokens` table if needed
//! let store = PostgresTokenStore::connect(&config).await?;
//!
//! let record = store.get_by_access("AT1").await?;
//!
//! store.close().await;
//! ```
//!
//! # Modules
//!
//! - [`config`]: Connection and table configuration, file/env loader
//! - [`error`]: Setup errors and driver error mapping
//! - [`pool`]: Connection pool management
//! - [`schema`]: Token table DDL and rendered statements
//! - [`token`]: Token row storage operations

pub mod config;
pub mod error;
pub mod pool;
pub mod schema;
pub mod token;

mod storage_adapters;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use tracing::{info, instrument};

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use config::PostgresStoreConfig;
pub use error::{PostgresError, Result};
pub use schema::TokenSchema;
pub use token::{TokenRow, TokenStorage};

// =============================================================================
// PostgreSQL Token Store
// =============================================================================

/// PostgreSQL-backed token store.
///
/// Holds a shared connection pool and the rendered statements for one token
/// table. Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresTokenStore {
    pool: Arc<PgPool>,
    schema: Arc<TokenSchema>,
}

impl PostgresTokenStore {
    /// Create a store over an existing connection pool.
    ///
    /// The table is not created; call [`TokenSchema::ensure_table`] or use
    /// [`PostgresTokenStore::connect`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is not a plain SQL identifier.
    pub fn new(pool: Arc<PgPool>, table: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pool,
            schema: Arc::new(TokenSchema::new(table)?),
        })
    }

    /// Validate the configuration, open a pool and provision the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the connection
    /// fails, or the table cannot be created.
    #[instrument(skip(config), fields(table = %config.table_name))]
    pub async fn connect(config: &PostgresStoreConfig) -> Result<Self> {
        config.validate()?;

        let pool = pool::create_pool(config).await?;
        let store = Self::new(Arc::new(pool), config.table_name.clone())?;

        if config.create_table {
            store.schema.ensure_table(&store.pool).await?;
        }

        info!("Token store ready");
        Ok(store)
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    ///
    /// Every clone of this store shares the pool and stops working too.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Token store closed");
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the Arc-wrapped pool.
    #[must_use]
    pub fn pool_arc(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Get the token table schema.
    #[must_use]
    pub fn schema(&self) -> &TokenSchema {
        &self.schema
    }

    /// Get the configured table name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.schema.table()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use sqlx_core::pool::PoolOptions;

    fn lazy_pool() -> Arc<PgPool> {
        let pool = PoolOptions::<Postgres>::new()
            .connect_lazy("postgres://localhost:5432/oauth2")
            .unwrap();
        Arc::new(pool)
    }

    #[tokio::test]
    async fn test_new_validates_table_name() {
        let store = PostgresTokenStore::new(lazy_pool(), "tokens").unwrap();
        assert_eq!(store.table(), "tokens");
        assert_eq!(store.schema().quoted_table(), "\"tokens\"");

        let err = PostgresTokenStore::new(lazy_pool(), "bad name").unwrap_err();
        assert!(matches!(err, PostgresError::Config { .. }));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config_before_connecting() {
        let config = PostgresStoreConfig::default().with_table_name("tokens; --");
        let err = PostgresTokenStore::connect(&config).await.unwrap_err();
        assert!(matches!(err, PostgresError::Config { .. }));
    }

    #[tokio::test]
    async fn test_clones_share_pool() {
        let store = PostgresTokenStore::new(lazy_pool(), "tokens").unwrap();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.pool_arc(), &clone.pool_arc()));

        store.close().await;
        assert!(clone.pool().is_closed());
    }
}
