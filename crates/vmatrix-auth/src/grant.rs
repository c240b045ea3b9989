//! Per-view grant tables.
//!
//! A [`GrantTable`] records which principals were explicitly granted
//! which permissions on one view, plus whether the view refuses to fall
//! back to the global table.
//!
//! # Lifecycle
//!
//! ```text
//! GrantTable::new() ──grant()*──► populated ──Arc::new──► shared, read-only
//! decode(records)   ─────────────► populated ──┘
//! ```
//!
//! Grants are only ever added while a table is being built. Editing a
//! view builds a fresh table and swaps it in whole; a shared table is
//! never modified in place.

use crate::evaluator;
use crate::permission::Permission;
use std::collections::{BTreeMap, BTreeSet};
use vmatrix_types::Sid;

/// Permission → principals mapping for one view.
///
/// # Example
///
/// ```
/// use vmatrix_auth::{builtin, GrantTable, PermissionCatalog, StaticCatalog};
/// use vmatrix_types::{Sid, TryNew};
///
/// let catalog = StaticCatalog::builtin();
/// let configure = catalog.resolve(builtin::VIEW_CONFIGURE).unwrap();
/// let read = catalog.resolve(builtin::VIEW_READ).unwrap();
///
/// let mut table = GrantTable::new();
/// table.grant(&configure, Sid::try_new("bob".to_string()).unwrap());
///
/// assert!(table.is_granted_explicit("bob", &configure));
/// assert!(!table.is_granted_explicit("bob", &read));
/// assert!(table.has_permission("bob", &read)); // Configure implies Read
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantTable {
    grants: BTreeMap<Permission, BTreeSet<Sid>>,
    /// Every principal appearing in `grants`.
    sids: BTreeSet<Sid>,
    blocks_inheritance: bool,
}

impl GrantTable {
    /// Creates an empty table that inherits from the global table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from an existing mapping.
    ///
    /// The table takes ownership of the sets; the caller keeps no
    /// handle into its internals. Empty sets are dropped.
    #[must_use]
    pub fn from_grants(grants: BTreeMap<Permission, BTreeSet<Sid>>) -> Self {
        let mut table = Self::new();
        for (permission, sids) in grants {
            for sid in sids {
                table.grant(&permission, sid);
            }
        }
        table
    }

    /// Grants `permission` to `sid`.
    ///
    /// Idempotent. Returns `true` if the pair was not present before.
    pub fn grant(&mut self, permission: &Permission, sid: Sid) -> bool {
        self.sids.insert(sid.clone());
        self.grants.entry(permission.clone()).or_default().insert(sid)
    }

    /// Returns `true` iff `sid` was granted exactly `permission`.
    ///
    /// No implication walk; see [`has_permission`](Self::has_permission).
    #[must_use]
    pub fn is_granted_explicit(&self, sid: &str, permission: &Permission) -> bool {
        self.grants
            .get(permission)
            .is_some_and(|sids| sids.contains(sid))
    }

    /// Returns `true` if `sid` holds `permission` on this table alone,
    /// directly or through a broader permission.
    #[must_use]
    pub fn has_permission(&self, sid: &str, permission: &Permission) -> bool {
        evaluator::has_permission(self, sid, permission)
    }

    /// Read-only view of all grants.
    #[must_use]
    pub fn all_granted_permissions(&self) -> &BTreeMap<Permission, BTreeSet<Sid>> {
        &self.grants
    }

    /// Principals with at least one grant, sorted, without `anonymous`.
    ///
    /// This is the row set shown when displaying the table.
    #[must_use]
    pub fn all_sids(&self) -> Vec<Sid> {
        self.sids.iter().filter(|s| !s.is_anonymous()).cloned().collect()
    }

    /// Every principal with at least one grant, `anonymous` included.
    #[must_use]
    pub fn sids(&self) -> &BTreeSet<Sid> {
        &self.sids
    }

    /// Iterates over every `(permission, principal)` pair in order.
    pub fn grants(&self) -> impl Iterator<Item = (&Permission, &Sid)> {
        self.grants
            .iter()
            .flat_map(|(permission, sids)| sids.iter().map(move |sid| (permission, sid)))
    }

    /// Whether evaluation must stop at this table.
    #[must_use]
    pub fn blocks_inheritance(&self) -> bool {
        self.blocks_inheritance
    }

    /// Sets the inheritance-blocking flag.
    pub fn set_blocks_inheritance(&mut self, blocks: bool) {
        self.blocks_inheritance = blocks;
    }

    /// Number of `(permission, principal)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
