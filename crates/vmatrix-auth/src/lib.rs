//! Permission matrix authorization for views.
//!
//! This crate is the decision core of vmatrix: it stores which
//! principals hold which permissions on a view and answers
//! "may principal X do P here?".
//!
//! # Model
//!
//! ```text
//! PermissionCatalog ──resolve──► Permission ──implied_by──► Permission ──► … (root)
//!                                     │
//! GrantTable  { Permission → {Sid} , blocks_inheritance }
//!                                     │
//! ResourcePolicy (local table? blocks inheritance? global present?)
//!                                     │
//!                                    Acl  = [local] | [local, global] | [global] | []
//! ```
//!
//! Evaluation walks the requested permission *up* its implication chain
//! and succeeds on the first ancestor explicitly granted to the
//! principal. Granting `Overall.Administer` therefore grants everything
//! it implies; granting `View.Read` grants nothing broader.
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`permission`] | [`Permission`], [`PermissionScope`] |
//! | [`catalog`] | [`PermissionCatalog`], [`StaticCatalog`], [`CatalogBuilder`] |
//! | [`grant`] | [`GrantTable`] |
//! | [`evaluator`] | [`has_permission`], [`Acl`] |
//! | [`policy`] | [`ResourcePolicy`] |
//! | [`codec`] | persisted grant records, legacy format detection |
//! | [`submission`] | configuration-form ingestion |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vmatrix_auth::{builtin, Acl, GrantTable, PermissionCatalog, StaticCatalog};
//! use vmatrix_types::{Sid, TryNew};
//!
//! let catalog = StaticCatalog::builtin();
//! let administer = catalog.resolve(builtin::ADMINISTER).unwrap();
//! let read = catalog.resolve(builtin::VIEW_READ).unwrap();
//!
//! let mut global = GrantTable::new();
//! global.grant(&administer, Sid::try_new("admin1".to_string()).unwrap());
//!
//! let acl = Acl::resolve(None, Some(Arc::new(global)));
//! assert!(acl.has_permission("admin1", &read));
//! assert!(!acl.has_permission("guest", &read));
//! ```

pub mod catalog;
pub mod codec;
pub mod error;
pub mod evaluator;
pub mod grant;
pub mod permission;
pub mod policy;
pub mod submission;

pub use catalog::{builtin, CatalogBuilder, CatalogError, PermissionCatalog, PermissionDecl, StaticCatalog};
pub use codec::{decode, detect_format, encode, DecodeWarning, Decoded, Node, Record, RecordFormat};
pub use error::AuthError;
pub use evaluator::{has_permission, Acl};
pub use grant::GrantTable;
pub use permission::{Permission, PermissionScope};
pub use policy::ResourcePolicy;
pub use submission::{check_sid_name, parse_submission, SubmissionError};

pub use vmatrix_types::{PermissionId, Sid, ViewName, ANONYMOUS};
