//! Core types for vmatrix.
//!
//! This crate holds the identifier newtypes and the error conventions
//! shared by every other vmatrix crate. It has no authorization logic.
//!
//! # Crate Architecture
//!
//! ```text
//! vmatrix-types    : Sid, PermissionId, ViewName, ErrorCode  ◄── HERE
//!     ↑
//! vmatrix-auth     : Permission, GrantTable, Acl, codec, submission
//!     ↑
//! vmatrix-runtime  : MatrixStrategy, StateStore, config
//!     ↑
//! vmatrix-cli      : `vmatrix` binary
//! ```
//!
//! # Example
//!
//! ```
//! use vmatrix_types::{Sid, TryNew, ViewName};
//!
//! let alice = Sid::try_new("alice".to_string()).unwrap();
//! assert!(!alice.is_anonymous());
//!
//! let view = ViewName::try_new("ops/nightly".to_string()).unwrap();
//! assert_eq!(view.as_str(), "ops/nightly");
//! ```

mod construct;
mod error;
mod id;

pub use construct::TryNew;
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{IdError, PermissionId, Sid, ViewName, ANONYMOUS};
