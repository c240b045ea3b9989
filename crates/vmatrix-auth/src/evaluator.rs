//! ACL evaluation.
//!
//! [`has_permission`] answers the question for a single table;
//! [`Acl`] chains tables according to a [`ResourcePolicy`] and is what
//! the request-handling layer holds while gating a view.
//!
//! # Algorithm
//!
//! ```text
//! p := requested permission
//! loop:
//!     if table grants p to sid explicitly → true
//!     p := p.implied_by
//!     if p is none → false
//! ```
//!
//! The walk only goes up: a narrow grant never satisfies a broader
//! request.

use crate::error::AuthError;
use crate::grant::GrantTable;
use crate::permission::Permission;
use crate::policy::ResourcePolicy;
use std::sync::Arc;

/// Returns `true` if `table` grants `permission`, or any permission
/// implying it, to `sid`.
#[must_use]
pub fn has_permission(table: &GrantTable, sid: &str, permission: &Permission) -> bool {
    permission
        .implication_chain()
        .any(|candidate| table.is_granted_explicit(sid, candidate))
}

/// An evaluation chain bound to one view.
///
/// Holds shared references to the tables that were current when it was
/// resolved. Later table swaps do not affect an `Acl` already handed out.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vmatrix_auth::{builtin, Acl, GrantTable, PermissionCatalog, StaticCatalog};
/// use vmatrix_types::{Sid, TryNew};
///
/// let catalog = StaticCatalog::builtin();
/// let read = catalog.resolve(builtin::VIEW_READ).unwrap();
///
/// let mut global = GrantTable::new();
/// global.grant(&read, Sid::try_new("alice".to_string()).unwrap());
/// let global = Arc::new(global);
///
/// let mut local = GrantTable::new();
/// local.set_blocks_inheritance(true);
///
/// let acl = Acl::resolve(Some(Arc::new(local)), Some(global.clone()));
/// assert!(!acl.has_permission("alice", &read));
///
/// let acl = Acl::resolve(None, Some(global));
/// assert!(acl.has_permission("alice", &read));
///
/// assert!(!Acl::deny_all().has_permission("alice", &read));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Acl {
    chain: Vec<Arc<GrantTable>>,
    policy: ResourcePolicy,
}

impl Acl {
    /// An ACL that denies everything.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            chain: Vec::new(),
            policy: ResourcePolicy::DenyAll,
        }
    }

    /// Builds the chain for a view from its optional local table and the
    /// optional global table.
    #[must_use]
    pub fn resolve(local: Option<Arc<GrantTable>>, global: Option<Arc<GrantTable>>) -> Self {
        let policy = ResourcePolicy::decide(local.as_deref(), global.is_some());
        let chain = match policy {
            ResourcePolicy::LocalOnly => local.into_iter().collect(),
            ResourcePolicy::LocalThenGlobal => local.into_iter().chain(global).collect(),
            ResourcePolicy::GlobalOnly => global.into_iter().collect(),
            ResourcePolicy::DenyAll => Vec::new(),
        };

        tracing::trace!(?policy, depth = chain.len(), "Resolved ACL chain");
        Self { chain, policy }
    }

    /// Returns `true` if any table in the chain grants `permission` to
    /// `sid`. Stops at the first table that does.
    #[must_use]
    pub fn has_permission(&self, sid: &str, permission: &Permission) -> bool {
        self.chain
            .iter()
            .any(|table| has_permission(table, sid, permission))
    }

    /// Returns `true` if any of `sids` holds `permission`.
    ///
    /// Use this with a principal and the groups a collaborator already
    /// resolved for it.
    #[must_use]
    pub fn has_permission_any<'a>(
        &self,
        sids: impl IntoIterator<Item = &'a str>,
        permission: &Permission,
    ) -> bool {
        sids.into_iter().any(|sid| self.has_permission(sid, permission))
    }

    /// Like [`has_permission`](Self::has_permission), as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessDenied`] if the permission is not held.
    pub fn check(&self, sid: &str, permission: &Permission) -> Result<(), AuthError> {
        if self.has_permission(sid, permission) {
            Ok(())
        } else {
            Err(AuthError::AccessDenied {
                sid: sid.to_string(),
                permission: permission.id().to_string(),
            })
        }
    }

    /// The policy this chain was resolved with.
    #[must_use]
    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }

    /// Number of tables consulted.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` if no table is consulted.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        self.chain.is_empty()
    }
}
