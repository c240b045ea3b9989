//! View-level matrix authorization strategy.
//!
//! [`MatrixStrategy`] owns the global grant table and the registry of
//! views, and hands out [`Acl`]s.
//!
//! # Concurrency
//!
//! ```text
//! global: RwLock<Option<Arc<GrantTable>>>
//! views:  RwLock<BTreeMap<ViewName, View>>      View { table: Option<Arc<GrantTable>> }
//!
//! reader:  read lock ─► clone Arc(s) ─► unlock ─► evaluate lock-free
//! writer:  build new GrantTable ─► write lock ─► swap Arc ─► unlock
//! ```
//!
//! Whole-state loads and snapshots hold both locks at once, always
//! `global` before `views`; every other method holds at most one.
//!
//! Tables are never modified after they are shared. An edit clones the
//! current table, changes the clone and swaps it in, so an evaluation in
//! flight keeps seeing the old table in full or the new one in full.

use crate::view::View;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use vmatrix_auth::{Acl, GrantTable, PermissionCatalog};
use vmatrix_types::{ErrorCode, IdError, Sid, TryNew, ViewName};

/// Errors from view registry operations.
///
/// Both variants mean the caller named a view the strategy cannot
/// act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The view name is empty or malformed.
    #[error("invalid view name: {0}")]
    InvalidViewName(#[from] IdError),

    /// No view with this name is registered.
    #[error("unknown view: {name}")]
    UnknownView { name: String },
}

impl ErrorCode for StrategyError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidViewName(_) => "STRATEGY_INVALID_VIEW_NAME",
            Self::UnknownView { .. } => "STRATEGY_UNKNOWN_VIEW",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Matrix authorization with per-view tables over a global table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vmatrix_auth::{builtin, GrantTable, PermissionCatalog, StaticCatalog};
/// use vmatrix_runtime::MatrixStrategy;
/// use vmatrix_types::{Sid, TryNew, ViewName};
///
/// let catalog = Arc::new(StaticCatalog::builtin());
/// let read = catalog.resolve(builtin::VIEW_READ).unwrap();
/// let strategy = MatrixStrategy::new(catalog);
///
/// let mut global = GrantTable::new();
/// global.grant(&read, Sid::try_new("alice".to_string()).unwrap());
/// strategy.set_global_table(global);
///
/// strategy.add_view(ViewName::try_new("ops".to_string()).unwrap());
/// let acl = strategy.get_acl("ops").unwrap();
/// assert!(acl.has_permission("alice", &read));
/// ```
pub struct MatrixStrategy {
    catalog: Arc<dyn PermissionCatalog>,
    global: RwLock<Option<Arc<GrantTable>>>,
    views: RwLock<BTreeMap<ViewName, View>>,
}

impl MatrixStrategy {
    /// Creates a strategy with no global table and no views.
    ///
    /// Until a global table is set, views without a table deny
    /// everything.
    #[must_use]
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            catalog,
            global: RwLock::new(None),
            views: RwLock::new(BTreeMap::new()),
        }
    }

    /// The permission catalog tables are resolved against.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn PermissionCatalog> {
        &self.catalog
    }

    /// Returns the evaluation chain for a view.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if `view` is empty or not registered.
    pub fn get_acl(&self, view: &str) -> Result<Acl, StrategyError> {
        let name = parse_view_name(view)?;
        let local = self
            .views
            .read()
            .get(&name)
            .ok_or_else(|| StrategyError::UnknownView {
                name: name.to_string(),
            })?
            .table()
            .cloned();
        let global = self.global.read().clone();

        Ok(Acl::resolve(local, global))
    }

    /// Returns the evaluation chain for instance-wide checks: the global
    /// table alone, or deny-all without one.
    #[must_use]
    pub fn root_acl(&self) -> Acl {
        Acl::resolve(None, self.global.read().clone())
    }

    /// Registers a view without a table.
    ///
    /// Returns `false` (and changes nothing) if the name is taken.
    pub fn add_view(&self, name: ViewName) -> bool {
        let mut views = self.views.write();
        if views.contains_key(&name) {
            return false;
        }
        tracing::debug!(view = %name, "Registered view");
        views.insert(name.clone(), View::new(name));
        true
    }

    /// Unregisters a view, dropping its table.
    pub fn remove_view(&self, name: &str) -> Option<View> {
        let removed = self.views.write().remove(name);
        if removed.is_some() {
            tracing::debug!(view = name, "Removed view");
        }
        removed
    }

    /// Replaces a view's table. Returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if the view is not registered.
    pub fn set_view_table(
        &self,
        view: &str,
        table: GrantTable,
    ) -> Result<Option<Arc<GrantTable>>, StrategyError> {
        self.swap_view_table(view, Some(Arc::new(table)))
    }

    /// Removes a view's table so it evaluates against the global table.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if the view is not registered.
    pub fn clear_view_table(&self, view: &str) -> Result<Option<Arc<GrantTable>>, StrategyError> {
        self.swap_view_table(view, None)
    }

    /// Applies `edit` to a copy of the view's table (or to a fresh
    /// table) and swaps the result in.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if the view is not registered.
    pub fn edit_view_table<F>(&self, view: &str, edit: F) -> Result<Arc<GrantTable>, StrategyError>
    where
        F: FnOnce(&mut GrantTable),
    {
        let name = parse_view_name(view)?;
        let mut views = self.views.write();
        let entry = views
            .get_mut(&name)
            .ok_or_else(|| StrategyError::UnknownView {
                name: name.to_string(),
            })?;

        let mut table = entry.table().map(|t| GrantTable::clone(t)).unwrap_or_default();
        edit(&mut table);
        let table = Arc::new(table);
        entry.replace_table(Some(Arc::clone(&table)));

        tracing::debug!(view = %name, grants = table.len(), "Edited view table");
        Ok(table)
    }

    /// The view's own table.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if the view is not registered.
    pub fn view_table(&self, view: &str) -> Result<Option<Arc<GrantTable>>, StrategyError> {
        let name = parse_view_name(view)?;
        self.views
            .read()
            .get(&name)
            .map(|v| v.table().cloned())
            .ok_or_else(|| StrategyError::UnknownView {
                name: name.to_string(),
            })
    }

    /// Replaces the global table. Returns the previous one.
    pub fn set_global_table(&self, table: GrantTable) -> Option<Arc<GrantTable>> {
        self.global.write().replace(Arc::new(table))
    }

    /// The global table.
    #[must_use]
    pub fn global_table(&self) -> Option<Arc<GrantTable>> {
        self.global.read().clone()
    }

    /// Registered view names in order.
    #[must_use]
    pub fn view_names(&self) -> Vec<ViewName> {
        self.views.read().keys().cloned().collect()
    }

    /// Every principal granted anything in the global table or any view
    /// table, `anonymous` included.
    ///
    /// For administrative listings only; evaluation never uses it.
    #[must_use]
    pub fn all_known_sids(&self) -> BTreeSet<Sid> {
        let mut sids = self
            .global
            .read()
            .as_ref()
            .map(|t| t.sids().clone())
            .unwrap_or_default();

        for view in self.views.read().values() {
            if let Some(table) = view.table() {
                sids.extend(table.sids().iter().cloned());
            }
        }
        sids
    }

    /// [`all_known_sids`](Self::all_known_sids) without `anonymous`, sorted.
    #[must_use]
    pub fn all_known_sids_for_display(&self) -> Vec<Sid> {
        self.all_known_sids()
            .into_iter()
            .filter(|s| !s.is_anonymous())
            .collect()
    }

    pub(crate) fn replace_all(
        &self,
        global: Option<GrantTable>,
        views: BTreeMap<ViewName, View>,
    ) {
        let mut global_slot = self.global.write();
        let mut view_slot = self.views.write();
        *global_slot = global.map(Arc::new);
        *view_slot = views;
    }

    pub(crate) fn snapshot(&self) -> (Option<Arc<GrantTable>>, Vec<View>) {
        let global = self.global.read();
        let views = self.views.read();
        (global.clone(), views.values().cloned().collect())
    }

    fn swap_view_table(
        &self,
        view: &str,
        table: Option<Arc<GrantTable>>,
    ) -> Result<Option<Arc<GrantTable>>, StrategyError> {
        let name = parse_view_name(view)?;
        let mut views = self.views.write();
        let entry = views
            .get_mut(&name)
            .ok_or_else(|| StrategyError::UnknownView {
                name: name.to_string(),
            })?;
        Ok(entry.replace_table(table))
    }
}

impl fmt::Debug for MatrixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixStrategy")
            .field("has_global", &self.global.read().is_some())
            .field("views", &self.views.read().len())
            .finish_non_exhaustive()
    }
}

fn parse_view_name(view: &str) -> Result<ViewName, StrategyError> {
    Ok(ViewName::try_new(view.to_string())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmatrix_auth::{builtin, Permission, ResourcePolicy, StaticCatalog};
    use vmatrix_types::assert_error_codes;

    fn sid(s: &str) -> Sid {
        Sid::try_new(s.to_string()).expect("valid sid")
    }

    fn view(s: &str) -> ViewName {
        ViewName::try_new(s.to_string()).expect("valid view name")
    }

    fn perm(id: &str) -> Permission {
        StaticCatalog::builtin().resolve(id).expect("builtin permission")
    }

    fn strategy() -> MatrixStrategy {
        MatrixStrategy::new(Arc::new(StaticCatalog::builtin()))
    }

    fn table(grants: &[(&str, &str)], blocks: bool) -> GrantTable {
        let mut t = GrantTable::new();
        for (p, s) in grants {
            t.grant(&perm(p), sid(s));
        }
        t.set_blocks_inheritance(blocks);
        t
    }

    #[test]
    fn unknown_and_empty_views_are_rejected() {
        let s = strategy();
        assert_eq!(
            s.get_acl("nope").unwrap_err(),
            StrategyError::UnknownView { name: "nope".into() }
        );
        assert!(matches!(
            s.get_acl("").unwrap_err(),
            StrategyError::InvalidViewName(IdError::Empty { .. })
        ));
    }

    #[test]
    fn view_without_table_and_no_global_denies() {
        let s = strategy();
        s.add_view(view("ops"));
        let acl = s.get_acl("ops").expect("registered");
        assert!(acl.is_deny_all());
        assert!(!acl.has_permission("admin", &perm(builtin::VIEW_READ)));
    }

    #[test]
    fn view_without_table_uses_global() {
        let s = strategy();
        s.set_global_table(table(&[(builtin::ADMINISTER, "admin1")], false));
        s.add_view(view("ops"));

        let acl = s.get_acl("ops").expect("registered");
        assert_eq!(acl.policy(), ResourcePolicy::GlobalOnly);
        assert!(acl.has_permission("admin1", &perm(builtin::VIEW_READ)));
    }

    #[test]
    fn blocking_view_ignores_global() {
        let s = strategy();
        s.set_global_table(table(&[(builtin::VIEW_READ, "alice")], false));
        s.add_view(view("ops"));
        s.set_view_table("ops", table(&[(builtin::VIEW_CREATE, "bob")], true))
            .expect("registered");

        let acl = s.get_acl("ops").expect("registered");
        assert!(!acl.has_permission("alice", &perm(builtin::VIEW_READ)));
        assert!(acl.has_permission("bob", &perm(builtin::VIEW_CREATE)));

        s.clear_view_table("ops").expect("registered");
        let acl = s.get_acl("ops").expect("registered");
        assert!(acl.has_permission("alice", &perm(builtin::VIEW_READ)));
    }

    #[test]
    fn add_view_twice_keeps_first() {
        let s = strategy();
        assert!(s.add_view(view("ops")));
        s.set_view_table("ops", table(&[(builtin::VIEW_READ, "a")], false))
            .expect("registered");
        assert!(!s.add_view(view("ops")));
        assert!(s.view_table("ops").expect("registered").is_some());
    }

    #[test]
    fn remove_view_drops_table() {
        let s = strategy();
        s.add_view(view("ops"));
        s.set_view_table("ops", table(&[(builtin::VIEW_READ, "a")], false))
            .expect("registered");

        let removed = s.remove_view("ops").expect("was registered");
        assert!(removed.table().is_some());
        assert!(s.view_names().is_empty());
        assert!(s.remove_view("ops").is_none());
    }

    #[test]
    fn edit_is_copy_on_write() {
        let s = strategy();
        s.add_view(view("ops"));
        s.set_view_table("ops", table(&[(builtin::VIEW_READ, "alice")], false))
            .expect("registered");

        let before = s.get_acl("ops").expect("registered");
        let after_table = s
            .edit_view_table("ops", |t| {
                t.grant(&perm(builtin::VIEW_DELETE), sid("bob"));
                t.set_blocks_inheritance(true);
            })
            .expect("registered");

        assert_eq!(after_table.len(), 2);
        assert!(!before.has_permission("bob", &perm(builtin::VIEW_DELETE)));
        let after = s.get_acl("ops").expect("registered");
        assert!(after.has_permission("bob", &perm(builtin::VIEW_DELETE)));
        assert!(after.has_permission("alice", &perm(builtin::VIEW_READ)));
    }

    #[test]
    fn edit_creates_table_when_missing() {
        let s = strategy();
        s.add_view(view("ops"));
        s.edit_view_table("ops", |t| t.set_blocks_inheritance(true))
            .expect("registered");
        let t = s.view_table("ops").expect("registered").expect("created");
        assert!(t.blocks_inheritance());
        assert!(t.is_empty());
    }

    #[test]
    fn known_sids_union_global_and_views() {
        let s = strategy();
        s.set_global_table(table(&[(builtin::VIEW_READ, "zoe")], false));
        s.add_view(view("a"));
        s.add_view(view("b"));
        s.add_view(view("c"));
        s.set_view_table("a", table(&[(builtin::VIEW_READ, "anonymous")], false))
            .expect("registered");
        s.set_view_table("b", table(&[(builtin::VIEW_CREATE, "alice")], false))
            .expect("registered");

        let all = s.all_known_sids();
        assert_eq!(all.len(), 3);
        assert!(all.contains("anonymous"));
        assert_eq!(s.all_known_sids_for_display(), vec![sid("alice"), sid("zoe")]);
    }

    #[test]
    fn root_acl_follows_global() {
        let s = strategy();
        assert!(s.root_acl().is_deny_all());
        s.set_global_table(table(&[(builtin::OVERALL_READ, "alice")], false));
        assert!(s.root_acl().has_permission("alice", &perm(builtin::OVERALL_READ)));
    }

    #[test]
    fn acl_survives_global_swap() {
        let s = strategy();
        s.set_global_table(table(&[(builtin::VIEW_READ, "alice")], false));
        s.add_view(view("ops"));
        let acl = s.get_acl("ops").expect("registered");

        s.set_global_table(GrantTable::new());
        assert!(acl.has_permission("alice", &perm(builtin::VIEW_READ)));
        assert!(!s
            .get_acl("ops")
            .expect("registered")
            .has_permission("alice", &perm(builtin::VIEW_READ)));
    }

    #[test]
    fn concurrent_readers_see_whole_tables() {
        let s = Arc::new(strategy());
        s.add_view(view("ops"));
        let read = perm(builtin::VIEW_READ);
        let delete = perm(builtin::VIEW_DELETE);

        let writer = {
            let s = Arc::clone(&s);
            let (read, delete) = (read.clone(), delete.clone());
            std::thread::spawn(move || {
                for i in 0..200 {
                    let mut t = GrantTable::new();
                    let p = if i % 2 == 0 { &read } else { &delete };
                    t.grant(p, Sid::try_new("x".to_string()).expect("valid sid"));
                    t.grant(p, Sid::try_new("y".to_string()).expect("valid sid"));
                    s.set_view_table("ops", t).expect("registered");
                }
            })
        };

        for _ in 0..200 {
            let acl = s.get_acl("ops").expect("registered");
            // Both principals always move together.
            assert_eq!(acl.has_permission("x", &read), acl.has_permission("y", &read));
            assert_eq!(acl.has_permission("x", &delete), acl.has_permission("y", &delete));
        }
        writer.join().expect("writer thread");
    }

    #[test]
    fn snapshot_never_mixes_generations() {
        fn generation(i: usize) -> (Option<GrantTable>, BTreeMap<ViewName, View>) {
            let mut global = GrantTable::new();
            global.grant(&perm(builtin::OVERALL_READ), sid(&format!("gen{i}")));
            let name = view(&format!("gen{i}"));
            let views = BTreeMap::from([(name.clone(), View::new(name))]);
            (Some(global), views)
        }

        let s = Arc::new(strategy());
        let (global, views) = generation(0);
        s.replace_all(global, views);

        let writer = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                for i in 1..200 {
                    let (global, views) = generation(i);
                    s.replace_all(global, views);
                }
            })
        };

        for _ in 0..200 {
            let (global, views) = s.snapshot();
            let global_sids = global.expect("global").all_sids();
            let view_names: Vec<String> = views.iter().map(|v| v.name().to_string()).collect();
            assert_eq!(view_names, [global_sids[0].to_string()]);
        }
        writer.join().expect("writer thread");
    }

    #[test]
    fn error_codes() {
        assert_error_codes(
            &[
                StrategyError::InvalidViewName(IdError::Empty { kind: "view name" }),
                StrategyError::UnknownView { name: "x".into() },
            ],
            "STRATEGY_",
        );
    }
}
