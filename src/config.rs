//! Registry configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[cfg(unix)]
use crate::registry::{CachedRegistry, CatalogRegistry, FileShapeStore, ShapeRegistry};
use crate::{Error, Result};

const DEFAULT_MAX_REGISTER_ATTEMPTS: u32 = 3;

/// Where the shape catalog lives and how registration behaves.
///
/// Loadable from JSON; only `catalog_dir` is required:
///
/// ```json
/// { "catalog_dir": "/var/lib/rrslice", "max_register_attempts": 5, "cache": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub catalog_dir: PathBuf,
    #[serde(default = "default_max_register_attempts")]
    pub max_register_attempts: u32,
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_max_register_attempts() -> u32 {
    DEFAULT_MAX_REGISTER_ATTEMPTS
}

fn default_cache() -> bool {
    true
}

impl RegistryConfig {
    pub fn new(catalog_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog_dir: catalog_dir.into(),
            max_register_attempts: DEFAULT_MAX_REGISTER_ATTEMPTS,
            cache: true,
        }
    }

    pub fn max_register_attempts(mut self, attempts: u32) -> Self {
        self.max_register_attempts = attempts;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfig`: unreadable file, bad JSON, or zero attempts
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|err| Error::InvalidConfig(format!("read {}: {err}", path.display())))?;
        let config: RegistryConfig = serde_json::from_str(&json)
            .map_err(|err| Error::InvalidConfig(format!("parse {}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_register_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_register_attempts must be at least 1".to_string(),
            ));
        }
        if self.catalog_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("catalog_dir is empty".to_string()));
        }
        Ok(())
    }
}

/// Open the file-backed registry described by `config`.
#[cfg(unix)]
pub fn open_registry(config: &RegistryConfig) -> Result<Box<dyn ShapeRegistry>> {
    config.validate()?;
    let store = FileShapeStore::open(&config.catalog_dir)?;
    let registry = CatalogRegistry::new(store).with_max_attempts(config.max_register_attempts);
    log::debug!(
        "opened shape catalog at {} (cache: {})",
        config.catalog_dir.display(),
        config.cache
    );
    if config.cache {
        Ok(Box::new(CachedRegistry::new(registry)))
    } else {
        Ok(Box::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"catalog_dir": "/tmp/shapes"}"#).unwrap();
        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config, RegistryConfig::new("/tmp/shapes"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"catalog_dir": "x", "max_register_attempts": 0}"#).unwrap();
        assert!(matches!(RegistryConfig::load(&path), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RegistryConfig::load(&dir.path().join("absent.json")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn opens_file_registry() {
        let dir = TempDir::new().unwrap();
        let config = RegistryConfig::new(dir.path().join("catalog")).cache(false);
        let registry = open_registry(&config).unwrap();
        let id = registry.register_shape(60, 5).unwrap();
        assert_eq!(registry.register_shape(60, 5).unwrap(), id);
        assert!(dir.path().join("catalog").join("shapes.json").exists());
    }
}
