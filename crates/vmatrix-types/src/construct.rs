//! Fallible construction.
//!
//! | Pattern | Use When |
//! |---------|----------|
//! | `new()` | Construction always succeeds |
//! | [`TryNew`] | Construction validates its input |
//! | `TryFrom<T>` | Converting from another type |
//!
//! Identifier newtypes in this crate use [`TryNew`] because an empty
//! principal or view name is never valid.

/// Trait for constructors that validate their input.
///
/// Types implementing `TryNew` do not also offer a plain `new()` that
/// performs the same validation; the `try_` prefix keeps fallibility
/// visible at the call site.
///
/// # Example
///
/// ```
/// use vmatrix_types::{Sid, TryNew};
///
/// assert!(Sid::try_new("bob".to_string()).is_ok());
/// assert!(Sid::try_new(String::new()).is_err());
/// ```
pub trait TryNew: Sized {
    /// Error returned when validation fails.
    type Error;

    /// Arguments required for construction.
    type Args;

    /// Attempts to create a new instance.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` describing why the input was rejected.
    fn try_new(args: Self::Args) -> Result<Self, Self::Error>;
}
