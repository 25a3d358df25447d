//! Common types and utilities.

/// Stream read error type.
pub use crate::error::Error;

/// Stream read result type.
pub type Result<T> = core::result::Result<T, Error>;
