//! Permission handles and implication chains.
//!
//! A [`Permission`] is a cheap, cloneable handle (`Arc` inside). It
//! records at most one broader permission that implies it, so the set
//! of all permissions forms a forest:
//!
//! ```text
//! Overall.Administer
//!   ├── Overall.Read
//!   ├── View.Configure
//!   │     └── View.Read
//!   ├── View.Create
//!   └── View.Delete
//! ```
//!
//! A parent must exist before a child can point at it, so a chain can
//! never loop back on itself and every walk terminates at a root.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use vmatrix_types::PermissionId;

/// Where a permission applies.
///
/// Only used to filter what administrative screens display; evaluation
/// ignores scopes entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Instance-wide operations.
    Overall,
    /// Operations on a view.
    View,
    /// Operations on individual work items.
    Item,
}

#[derive(Debug)]
struct Inner {
    id: PermissionId,
    implied_by: Option<Permission>,
    scopes: Vec<PermissionScope>,
    enabled: bool,
}

/// A permission identifier together with its implication parent.
///
/// Equality, ordering and hashing use the identifier only.
#[derive(Clone)]
pub struct Permission(Arc<Inner>);

impl Permission {
    /// Creates an enabled permission.
    #[must_use]
    pub fn new(id: PermissionId, implied_by: Option<&Permission>, scopes: &[PermissionScope]) -> Self {
        Self::with_enabled(id, implied_by, scopes, true)
    }

    /// Creates a permission with an explicit enabled flag.
    ///
    /// Disabled permissions still evaluate normally; they are only
    /// hidden from [`view_permissions`](crate::PermissionCatalog::view_permissions).
    #[must_use]
    pub fn with_enabled(
        id: PermissionId,
        implied_by: Option<&Permission>,
        scopes: &[PermissionScope],
        enabled: bool,
    ) -> Self {
        let mut scopes = scopes.to_vec();
        scopes.sort();
        scopes.dedup();
        Self(Arc::new(Inner {
            id,
            implied_by: implied_by.cloned(),
            scopes,
            enabled,
        }))
    }

    /// The permission identifier.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.0.id
    }

    /// The broader permission that implies this one, if any.
    #[must_use]
    pub fn implied_by(&self) -> Option<&Permission> {
        self.0.implied_by.as_ref()
    }

    /// Scopes this permission applies to.
    #[must_use]
    pub fn scopes(&self) -> &[PermissionScope] {
        &self.0.scopes
    }

    /// Returns `true` if the permission applies to `scope`.
    #[must_use]
    pub fn is_contained_by(&self, scope: PermissionScope) -> bool {
        self.0.scopes.contains(&scope)
    }

    /// Whether the permission is shown for configuration.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.enabled
    }

    /// Iterates from this permission up to its root, inclusive.
    ///
    /// # Example
    ///
    /// ```
    /// use vmatrix_auth::{builtin, PermissionCatalog, StaticCatalog};
    ///
    /// let catalog = StaticCatalog::builtin();
    /// let read = catalog.resolve(builtin::VIEW_READ).unwrap();
    /// let ids: Vec<&str> = read.implication_chain().map(|p| p.id().as_str()).collect();
    /// assert_eq!(ids, ["View.Read", "View.Configure", "Overall.Administer"]);
    /// ```
    #[must_use]
    pub fn implication_chain(&self) -> ImplicationChain<'_> {
        ImplicationChain { next: Some(self) }
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Permission {}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permission")
            .field("id", &self.0.id)
            .field("implied_by", &self.0.implied_by.as_ref().map(Permission::id))
            .field("scopes", &self.0.scopes)
            .field("enabled", &self.0.enabled)
            .finish()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.id.as_str())
    }
}

/// Iterator returned by [`Permission::implication_chain`].
#[derive(Debug, Clone)]
pub struct ImplicationChain<'a> {
    next: Option<&'a Permission>,
}

impl<'a> Iterator for ImplicationChain<'a> {
    type Item = &'a Permission;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.implied_by();
        Some(current)
    }
}
