//! Domain types shared by every token store backend.
//!
//! - [`TokenRecord`] - access/refresh token pair with grant metadata

pub mod token;

pub use token::{MAX_LIFETIME, TokenRecord, truncate_lifetime, truncate_timestamp};
