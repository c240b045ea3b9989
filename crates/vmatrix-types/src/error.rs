//! Error code conventions shared by all vmatrix crates.
//!
//! Every vmatrix error type implements [`ErrorCode`] so callers can
//! branch on a stable machine-readable code and decide whether the
//! condition is worth reporting as a warning or must fail the operation.
//!
//! # Prefixes
//!
//! | Prefix | Crate / layer |
//! |--------|---------------|
//! | `ID_` | identifier construction |
//! | `AUTH_` | evaluation, grant tables, catalog |
//! | `DECODE_` | persisted record warnings |
//! | `FORM_` | configuration-form submissions |
//! | `STRATEGY_` | view registry |
//! | `STORE_` | state persistence |
//! | `CONFIG_` | configuration loading |

/// Machine-readable error code interface.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE
/// - Prefixed with the layer (see module docs)
/// - Stable once published
///
/// # Recoverability
///
/// An error is recoverable when the surrounding operation can continue
/// (for example a skipped persisted record) or when the caller can fix
/// the input and retry. Malformed submissions and unknown views are not
/// recoverable: retrying the same request yields the same answer.
///
/// # Example
///
/// ```
/// use vmatrix_types::ErrorCode;
///
/// enum LookupError {
///     Missing,
///     Corrupt,
/// }
///
/// impl ErrorCode for LookupError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Missing => "LOOKUP_MISSING",
///             Self::Corrupt => "LOOKUP_CORRUPT",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         matches!(self, Self::Missing)
///     }
/// }
///
/// assert_eq!(LookupError::Corrupt.code(), "LOOKUP_CORRUPT");
/// assert!(LookupError::Missing.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether the surrounding operation can continue or be retried.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows the naming conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use vmatrix_types::{assert_error_code, ErrorCode};
///
/// struct Boom;
///
/// impl ErrorCode for Boom {
///     fn code(&self) -> &'static str { "TEST_BOOM" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Boom, "TEST_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] for every value in `errors`.
///
/// Use it with one value per variant to pin down a whole error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
