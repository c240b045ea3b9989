//! Runtime layer for vmatrix.
//!
//! Wires the authorization core into something a host can run:
//!
//! ```text
//! ConfigLoader ──► VmatrixConfig ──build_catalog──► Arc<dyn PermissionCatalog>
//!                                                          │
//! StateStore ──load_into──► MatrixStrategy { global, views } ◄┘
//!                                 │
//!                           get_acl(view) ──► Acl
//! ```
//!
//! # Modules
//!
//! - [`strategy`]: [`MatrixStrategy`], the view registry and ACL source
//! - [`view`]: [`View`]
//! - [`store`]: [`StateStore`] JSON persistence
//! - [`referer`]: [`view_from_referer`]
//! - [`config`]: layered TOML configuration

pub mod config;
pub mod referer;
pub mod store;
pub mod strategy;
pub mod view;

pub use config::{ConfigError, ConfigLoader, VmatrixConfig};
pub use referer::view_from_referer;
pub use store::{LoadReport, StateStore, StoreError};
pub use strategy::{MatrixStrategy, StrategyError};
pub use view::View;
