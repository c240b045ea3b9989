//! Identifier newtypes.
//!
//! All identifiers are opaque, validated strings:
//!
//! | Type | Rule |
//! |------|------|
//! | [`Sid`] | non-empty |
//! | [`PermissionId`] | non-empty, no `:` (the grant record separator) |
//! | [`ViewName`] | non-empty, no surrounding whitespace |
//!
//! Each type implements `Borrow<str>` so sets keyed by it can be queried
//! with a plain `&str`.

use crate::{ErrorCode, TryNew};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// The principal used for unauthenticated callers.
///
/// It is a valid grant target but never listed among known principals.
pub const ANONYMOUS: &str = "anonymous";

/// Identifier validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which identifier kind was rejected.
        kind: &'static str,
    },

    /// Identifier contained a forbidden character.
    #[error("{kind} '{value}' must not contain '{ch}'")]
    ForbiddenChar {
        kind: &'static str,
        value: String,
        ch: char,
    },

    /// Identifier has leading or trailing whitespace.
    #[error("{kind} '{value}' has surrounding whitespace")]
    Untrimmed { kind: &'static str, value: String },
}

impl ErrorCode for IdError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "ID_EMPTY",
            Self::ForbiddenChar { .. } => "ID_FORBIDDEN_CHAR",
            Self::Untrimmed { .. } => "ID_UNTRIMMED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::try_new(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// A principal (user or group) identifier.
///
/// Opaque to the authorization core: group membership is resolved
/// elsewhere, and a `Sid` is compared byte-for-byte.
///
/// # Example
///
/// ```
/// use vmatrix_types::{Sid, TryNew};
///
/// let sid = Sid::try_new("anonymous".to_string()).unwrap();
/// assert!(sid.is_anonymous());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid(String);

impl TryNew for Sid {
    type Error = IdError;
    type Args = String;

    fn try_new(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IdError::Empty { kind: "principal" });
        }
        Ok(Self(value))
    }
}

impl Sid {
    /// Returns the anonymous principal.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    /// Returns `true` for the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }
}

string_id!(Sid);

/// A permission identifier such as `View.Configure`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionId(String);

impl TryNew for PermissionId {
    type Error = IdError;
    type Args = String;

    fn try_new(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IdError::Empty { kind: "permission id" });
        }
        if value.contains(':') {
            return Err(IdError::ForbiddenChar {
                kind: "permission id",
                value,
                ch: ':',
            });
        }
        Ok(Self(value))
    }
}

impl PermissionId {
    /// Creates an identifier from a compile-time constant.
    ///
    /// Constants are checked in debug builds only; use
    /// [`TryNew::try_new`] for anything read at runtime.
    #[must_use]
    pub fn builtin(id: &'static str) -> Self {
        debug_assert!(!id.is_empty() && !id.contains(':'), "invalid built-in id {id}");
        Self(id.to_string())
    }
}

string_id!(PermissionId);

/// The name of a view (a named grouping of work items).
///
/// Nested views use `/` separated paths, e.g. `ops/nightly`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ViewName(String);

impl TryNew for ViewName {
    type Error = IdError;
    type Args = String;

    fn try_new(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IdError::Empty { kind: "view name" });
        }
        if value.trim() != value {
            return Err(IdError::Untrimmed {
                kind: "view name",
                value,
            });
        }
        Ok(Self(value))
    }
}

string_id!(ViewName);
