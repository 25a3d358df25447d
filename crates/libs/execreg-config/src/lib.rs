//! Configuration management for the execreg process registry.
//!
//! # Usage
//!
//! ```rust
//! use execreg_config::RegistryConfig;
//!
//! let config = RegistryConfig::from_toml("chunk_size = 512").unwrap();
//! assert_eq!(config.chunk_size, 512);
//! assert_eq!(config.first_id, 1004);
//! ```

pub mod error;
pub mod prelude;
pub mod registry_config;

pub use registry_config::RegistryConfig;
