//! Storage traits for token records.
//!
//! # Implementations
//!
//! - [`crate::memory::MemoryTokenStore`] - non-persistent, for tests
//! - `oauth2-store-postgres` - PostgreSQL storage backend

pub mod token;

pub use token::{TokenStore, validate_key, validate_record};
