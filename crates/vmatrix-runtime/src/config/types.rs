//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vmatrix_auth::{CatalogBuilder, PermissionDecl, StaticCatalog};

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use vmatrix_runtime::config::VmatrixConfig;
///
/// let config = VmatrixConfig::default();
/// assert!(!config.debug);
/// assert!(config.catalog.includes_builtin());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VmatrixConfig {
    /// Enable debug logging.
    pub debug: bool,

    /// Permission catalog configuration.
    pub catalog: CatalogConfig,

    /// Path configuration.
    pub paths: PathsConfig,
}

impl VmatrixConfig {
    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they
    /// differ from the default.
    pub fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.debug != default.debug {
            self.debug = other.debug;
        }

        self.catalog.merge(&other.catalog);
        self.paths.merge(&other.paths);
    }

    /// Builds the permission catalog this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Catalog`] if the declarations are invalid.
    pub fn build_catalog(&self) -> Result<StaticCatalog, ConfigError> {
        let builder = if self.catalog.includes_builtin() {
            CatalogBuilder::new().with_builtin()
        } else {
            CatalogBuilder::new()
        };
        Ok(builder
            .declare_all(self.catalog.permissions.iter().cloned())
            .build()?)
    }
}

/// Permission catalog configuration.
///
/// ```toml
/// [catalog]
/// builtin = true
///
/// [[catalog.permissions]]
/// id = "Item.Build"
/// implied_by = "Overall.Administer"
/// scopes = ["view", "item"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the built-in permission set. Unset means included.
    ///
    /// Kept optional so a later layer can switch the set back on after
    /// an earlier one turned it off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin: Option<bool>,

    /// Additional permissions.
    pub permissions: Vec<PermissionDecl>,
}

impl CatalogConfig {
    /// Whether the built-in permission set is part of the catalog.
    #[must_use]
    pub fn includes_builtin(&self) -> bool {
        self.builtin.unwrap_or(true)
    }

    // Declarations accumulate across layers; a repeated id is reported
    // when the catalog is built.
    fn merge(&mut self, other: &Self) {
        if other.builtin.is_some() {
            self.builtin = other.builtin;
        }
        self.permissions.extend(other.permissions.iter().cloned());
    }
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// State file location (views and grant tables).
    pub state_file: Option<PathBuf>,
}

impl PathsConfig {
    fn merge(&mut self, other: &Self) {
        if other.state_file.is_some() {
            self.state_file = other.state_file.clone();
        }
    }

    /// The configured state file, or the default under `base`.
    #[must_use]
    pub fn state_file_or(&self, base: &std::path::Path) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| base.join(super::DEFAULT_STATE_FILE))
    }
}
