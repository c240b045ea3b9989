//! Evaluation errors.
//!
//! Evaluation itself never fails: missing tables resolve to a definite
//! answer. [`AuthError`] exists for callers that prefer to gate with `?`
//! ([`Acl::check`](crate::Acl::check)) and for contract violations at the
//! API boundary.

use thiserror::Error;
use vmatrix_types::ErrorCode;

/// Authorization error.
///
/// # Example
///
/// ```
/// use vmatrix_auth::AuthError;
/// use vmatrix_types::ErrorCode;
///
/// let err = AuthError::AccessDenied {
///     sid: "bob".to_string(),
///     permission: "View.Read".to_string(),
/// };
/// assert!(err.to_string().contains("View.Read"));
/// assert_eq!(err.code(), "AUTH_ACCESS_DENIED");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The principal does not hold the permission.
    #[error("access denied: '{sid}' is missing the {permission} permission")]
    AccessDenied {
        /// Principal that was checked.
        sid: String,
        /// Permission that was required.
        permission: String,
    },

    /// The caller passed an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "AUTH_ACCESS_DENIED",
            Self::InvalidArgument(_) => "AUTH_INVALID_ARGUMENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
