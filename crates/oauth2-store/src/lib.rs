//! # oauth2-store
//!
//! Token storage contract for an OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - [`TokenRecord`], the persisted access/refresh token pair
//! - [`TokenStore`], the trait every storage backend implements
//! - [`StoreError`], the error taxonomy shared by all backends
//! - [`MemoryTokenStore`], a non-persistent backend for tests
//!
//! The PostgreSQL backend lives in `oauth2-store-postgres`.
//!
//! ## Modules
//!
//! - [`error`] - Store error types
//! - [`types`] - Token record type
//! - [`storage`] - Storage trait and input checks
//! - [`memory`] - In-memory backend

pub mod error;
pub mod memory;
pub mod storage;
pub mod types;

pub use error::{ErrorCategory, StoreError};
pub use memory::MemoryTokenStore;
pub use storage::TokenStore;
pub use types::TokenRecord;

/// Type alias for token store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oauth2_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::StoreResult;
    pub use crate::error::{ErrorCategory, StoreError};
    pub use crate::memory::MemoryTokenStore;
    pub use crate::storage::TokenStore;
    pub use crate::types::TokenRecord;
}
