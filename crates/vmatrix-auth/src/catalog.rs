//! Permission catalog.
//!
//! The catalog is the registry of known permissions. It is built once
//! at startup and handed to the decoder, the submission parser and the
//! strategy as a read-only dependency (`Arc<dyn PermissionCatalog>`).
//!
//! # Architecture
//!
//! ```text
//! PermissionCatalog trait (THIS MODULE)
//!          │
//!          └── StaticCatalog   ← built from CatalogBuilder / config
//! ```

use crate::permission::{Permission, PermissionScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use vmatrix_types::{ErrorCode, IdError, PermissionId, TryNew};

/// Identifiers of the built-in permissions.
pub mod builtin {
    /// Root of the forest; implies every other built-in permission.
    pub const ADMINISTER: &str = "Overall.Administer";
    /// Read access to the instance.
    pub const OVERALL_READ: &str = "Overall.Read";
    /// Change a view's configuration, including its grant table.
    pub const VIEW_CONFIGURE: &str = "View.Configure";
    /// Create views.
    pub const VIEW_CREATE: &str = "View.Create";
    /// Delete views.
    pub const VIEW_DELETE: &str = "View.Delete";
    /// See a view.
    pub const VIEW_READ: &str = "View.Read";
}

/// Catalog construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A declared identifier is not a valid permission id.
    #[error("invalid permission id: {0}")]
    InvalidId(#[from] IdError),

    /// The same identifier was declared twice.
    #[error("permission '{id}' declared more than once")]
    Duplicate { id: String },

    /// `implied_by` names a permission that is not declared.
    #[error("permission '{id}' is implied by unknown permission '{parent}'")]
    UnknownParent { id: String, parent: String },

    /// Declarations form an implication cycle.
    #[error("implication cycle: {path}")]
    Cycle { path: String },
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "AUTH_CATALOG_INVALID_ID",
            Self::Duplicate { .. } => "AUTH_CATALOG_DUPLICATE",
            Self::UnknownParent { .. } => "AUTH_CATALOG_UNKNOWN_PARENT",
            Self::Cycle { .. } => "AUTH_CATALOG_CYCLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Read-only registry of known permissions.
///
/// # Implementors
///
/// - [`StaticCatalog`]: in-memory catalog built at startup
/// - Test doubles
pub trait PermissionCatalog: Send + Sync + fmt::Debug {
    /// Looks up a permission by identifier.
    fn resolve(&self, id: &str) -> Option<Permission>;

    /// All known permissions, ordered by identifier.
    fn permissions(&self) -> Vec<Permission>;

    /// Returns `true` if `id` names a known permission.
    fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }

    /// Enabled permissions that apply to views.
    ///
    /// This is the column set an administrative screen shows when
    /// editing a view's grant table.
    fn view_permissions(&self) -> Vec<Permission> {
        self.permissions()
            .into_iter()
            .filter(|p| p.is_enabled() && p.is_contained_by(PermissionScope::View))
            .collect()
    }
}

/// One permission declaration, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecl {
    /// Permission identifier.
    pub id: String,

    /// Identifier of the broader permission implying this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_by: Option<String>,

    /// Scopes the permission applies to.
    #[serde(default)]
    pub scopes: Vec<PermissionScope>,

    /// Whether the permission is offered for configuration.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PermissionDecl {
    /// Declares an enabled permission.
    #[must_use]
    pub fn new(id: impl Into<String>, implied_by: Option<&str>, scopes: &[PermissionScope]) -> Self {
        Self {
            id: id.into(),
            implied_by: implied_by.map(str::to_string),
            scopes: scopes.to_vec(),
            enabled: true,
        }
    }
}

/// In-memory permission catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    by_id: BTreeMap<PermissionId, Permission>,
}

impl StaticCatalog {
    /// Catalog with the built-in permissions only.
    #[must_use]
    pub fn builtin() -> Self {
        let administer = builtin_permission(builtin::ADMINISTER, None, PermissionScope::Overall);
        let overall_read =
            builtin_permission(builtin::OVERALL_READ, Some(&administer), PermissionScope::Overall);
        let configure =
            builtin_permission(builtin::VIEW_CONFIGURE, Some(&administer), PermissionScope::View);
        let create = builtin_permission(builtin::VIEW_CREATE, Some(&administer), PermissionScope::View);
        let delete = builtin_permission(builtin::VIEW_DELETE, Some(&administer), PermissionScope::View);
        let read = builtin_permission(builtin::VIEW_READ, Some(&configure), PermissionScope::View);

        let by_id = [administer, overall_read, configure, create, delete, read]
            .into_iter()
            .map(|p| (p.id().clone(), p))
            .collect();
        Self { by_id }
    }

    /// Number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if the catalog has no permissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn builtin_permission(id: &'static str, parent: Option<&Permission>, scope: PermissionScope) -> Permission {
    Permission::new(PermissionId::builtin(id), parent, &[scope])
}

impl PermissionCatalog for StaticCatalog {
    fn resolve(&self, id: &str) -> Option<Permission> {
        self.by_id.get(id).cloned()
    }

    fn permissions(&self) -> Vec<Permission> {
        self.by_id.values().cloned().collect()
    }
}

/// Builds a [`StaticCatalog`] from declarations in any order.
///
/// # Example
///
/// ```
/// use vmatrix_auth::{CatalogBuilder, PermissionCatalog, PermissionDecl, PermissionScope};
///
/// let catalog = CatalogBuilder::new()
///     .with_builtin()
///     .declare(PermissionDecl::new("View.Publish", Some("View.Configure"), &[PermissionScope::View]))
///     .build()
///     .unwrap();
///
/// let publish = catalog.resolve("View.Publish").unwrap();
/// assert_eq!(publish.implied_by().unwrap().id().as_str(), "View.Configure");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    prebuilt: BTreeMap<PermissionId, Permission>,
    decls: Vec<PermissionDecl>,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder with the built-in permissions.
    ///
    /// Declarations may use built-in permissions as parents.
    #[must_use]
    pub fn with_builtin(mut self) -> Self {
        self.prebuilt.extend(StaticCatalog::builtin().by_id);
        self
    }

    /// Adds one declaration.
    #[must_use]
    pub fn declare(mut self, decl: PermissionDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Adds several declarations.
    #[must_use]
    pub fn declare_all(mut self, decls: impl IntoIterator<Item = PermissionDecl>) -> Self {
        self.decls.extend(decls);
        self
    }

    /// Resolves all declarations into a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on invalid or duplicate ids, unknown
    /// parents, or implication cycles.
    pub fn build(self) -> Result<StaticCatalog, CatalogError> {
        let mut pending: BTreeMap<PermissionId, PermissionDecl> = BTreeMap::new();
        for decl in self.decls {
            let id = PermissionId::try_new(decl.id.clone())?;
            if self.prebuilt.contains_key(&id) || pending.contains_key(&id) {
                return Err(CatalogError::Duplicate { id: decl.id });
            }
            pending.insert(id, decl);
        }

        let mut built = self.prebuilt;
        let ids: Vec<PermissionId> = pending.keys().cloned().collect();
        for id in &ids {
            let mut stack = Vec::new();
            resolve_decl(id, &pending, &mut built, &mut stack)?;
        }

        tracing::debug!(count = built.len(), "Built permission catalog");
        Ok(StaticCatalog { by_id: built })
    }
}

fn resolve_decl(
    id: &PermissionId,
    pending: &BTreeMap<PermissionId, PermissionDecl>,
    built: &mut BTreeMap<PermissionId, Permission>,
    stack: &mut Vec<PermissionId>,
) -> Result<Permission, CatalogError> {
    if let Some(existing) = built.get(id) {
        return Ok(existing.clone());
    }
    if stack.contains(id) {
        stack.push(id.clone());
        let path = stack
            .iter()
            .map(PermissionId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(CatalogError::Cycle { path });
    }

    let decl = pending.get(id).ok_or_else(|| CatalogError::UnknownParent {
        id: id.to_string(),
        parent: id.to_string(),
    })?;

    stack.push(id.clone());
    let parent = match decl.implied_by.as_deref() {
        None => None,
        Some(parent_id) => {
            let key = built
                .get_key_value(parent_id)
                .map(|(k, _)| k.clone())
                .or_else(|| pending.get_key_value(parent_id).map(|(k, _)| k.clone()))
                .ok_or_else(|| CatalogError::UnknownParent {
                    id: decl.id.clone(),
                    parent: parent_id.to_string(),
                })?;
            Some(resolve_decl(&key, pending, built, stack)?)
        }
    };
    stack.pop();

    let permission = Permission::with_enabled(id.clone(), parent.as_ref(), &decl.scopes, decl.enabled);
    built.insert(id.clone(), permission.clone());
    Ok(permission)
}
