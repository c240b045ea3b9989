//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────────┐
//! │  1. Environment Variables (VMATRIX_*)        │  Runtime override
//! ├──────────────────────────────────────────────┤
//! │  2. Project Config (.vmatrix/config.toml)    │  Project-specific
//! ├──────────────────────────────────────────────┤
//! │  3. Global Config (~/.vmatrix/config.toml)   │  User defaults
//! ├──────────────────────────────────────────────┤
//! │  4. Default Values (compile-time)            │  Fallback
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Directory Structure
//!
//! ```text
//! ~/.vmatrix/
//! └── config.toml              # Global configuration
//!
//! <project>/.vmatrix/
//! ├── config.toml              # Project configuration (overrides global)
//! └── state.json               # Views and grant tables (default location)
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `VMATRIX_DEBUG` | `debug` | bool |
//! | `VMATRIX_BUILTIN_PERMISSIONS` | `catalog.builtin` | bool |
//! | `VMATRIX_STATE_FILE` | `paths.state_file` | PathBuf |
//!
//! # Example Configuration
//!
//! ```toml
//! debug = false
//!
//! [catalog]
//! builtin = true
//!
//! [[catalog.permissions]]
//! id = "Item.Build"
//! implied_by = "Overall.Administer"
//! scopes = ["view", "item"]
//!
//! [paths]
//! state_file = "/var/lib/vmatrix/state.json"
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{CatalogConfig, PathsConfig, VmatrixConfig};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".vmatrix")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".vmatrix";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";

/// State file name used when none is configured.
pub const DEFAULT_STATE_FILE: &str = "state.json";
