//! Common types and utilities.

/// Registry error type.
pub use crate::error::Error;

/// Registry result type.
pub type Result<T> = core::result::Result<T, Error>;
