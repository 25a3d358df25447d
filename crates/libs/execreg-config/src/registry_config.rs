//! Registry tunables.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prelude::*;

/// Identifier handed out to the first spawned process.
pub const DEFAULT_FIRST_ID: u64 = 1004;

/// Maximum number of bytes returned by one bounded read.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Process registry settings.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Identifier assigned to the first spawned process.
    pub first_id: u64,
    /// Maximum number of bytes returned by a single fetch.
    pub chunk_size: usize,
    /// Timeout applied to processes spawned without an explicit scope.
    /// Unset means reads may block until data arrives or the stream closes.
    pub default_timeout_ms: Option<u64>,
    /// Kill a child as soon as its scope expires.
    pub kill_on_scope_expiry: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            first_id: DEFAULT_FIRST_ID,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_timeout_ms: None,
            kill_on_scope_expiry: false,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(file_path)?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded registry configuration from {}", file_path.display());
        Ok(config)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        let config: Self = toml::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidValue(
                "chunk_size",
                String::from("must be greater than zero"),
            ));
        }
        Ok(())
    }

    /// Timeout applied to processes spawned without an explicit scope.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() -> Result<()> {
        let config = RegistryConfig::from_toml("")?;
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.first_id, 1004);
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.default_timeout(), None);
        assert!(!config.kill_on_scope_expiry);
        Ok(())
    }

    #[test]
    fn deserialize() -> Result<()> {
        let content = r#"
            # Registry configuration
            first_id = 1
            chunk_size = 4096
            default_timeout_ms = 1500
            kill_on_scope_expiry = true
        "#;
        let config = RegistryConfig::from_toml(content)?;
        assert_eq!(config.first_id, 1);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(1500)));
        assert!(config.kill_on_scope_expiry);
        Ok(())
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = RegistryConfig::from_toml("chunk_size = 0");
        assert!(matches!(result, Err(Error::InvalidValue("chunk_size", _))));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let result = RegistryConfig::from_toml("first_id = \"one\"");
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }

    #[test]
    fn toml_round_trip() -> Result<()> {
        let config = RegistryConfig {
            first_id: 7,
            default_timeout_ms: Some(250),
            ..RegistryConfig::default()
        };
        assert_eq!(RegistryConfig::from_toml(&config.to_toml()?)?, config);
        Ok(())
    }

    #[test]
    fn from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "chunk_size = 64")?;

        let config = RegistryConfig::from_file(file.path())?;
        assert_eq!(config.chunk_size, 64);
        assert!(RegistryConfig::from_file(Path::new("/does/not/exist.toml")).is_err());
        Ok(())
    }
}
