//! Persisted view and global state.
//!
//! [`StateStore`] reads and writes a single JSON file (see
//! [`document`] for the layout). Grant records go through the
//! [`vmatrix_auth::codec`], so both the current record format and the
//! legacy field dump load transparently.
//!
//! # Load semantics
//!
//! Loading is all-or-nothing at the document level: a file that cannot
//! be parsed, a bad view name, a duplicated view or a view with two
//! grant tables fails the load and leaves the strategy untouched.
//! Within a grant table, unreadable records are skipped and listed in
//! the returned [`LoadReport`].
//!
//! View properties of other kinds are kept on the [`View`] and written
//! back as they were read.

pub mod document;
mod error;

pub use document::{PropertyDocument, StateDocument, ViewDocument, MATRIX_PROPERTY_KIND};
pub use error::StoreError;

use crate::strategy::MatrixStrategy;
use crate::view::View;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use vmatrix_auth::{codec, DecodeWarning, GrantTable, PermissionCatalog};
use vmatrix_types::{TryNew, ViewName};

/// Warnings collected while loading.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    warnings: Vec<(String, DecodeWarning)>,
}

impl LoadReport {
    /// `(context, warning)` pairs; the context is `global` or
    /// `view '<name>'`.
    #[must_use]
    pub fn warnings(&self) -> &[(String, DecodeWarning)] {
        &self.warnings
    }

    /// Returns `true` if nothing was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn absorb(&mut self, context: &str, warnings: Vec<DecodeWarning>) {
        self.warnings
            .extend(warnings.into_iter().map(|w| (context.to_string(), w)));
    }
}

/// File-backed state store.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by `path`. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file into `strategy`, replacing its global table and
    /// views.
    ///
    /// A missing file loads as empty state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed, or
    /// its views are inconsistent.
    pub fn load_into(&self, strategy: &MatrixStrategy) -> Result<LoadReport, StoreError> {
        let document = self.read_document()?;
        let (global, views, report) = materialize(document, strategy.catalog().as_ref())?;

        tracing::debug!(
            path = %self.path.display(),
            views = views.len(),
            has_global = global.is_some(),
            skipped = report.warnings.len(),
            "Loaded state"
        );
        strategy.replace_all(global, views);
        Ok(report)
    }

    /// Writes the strategy's current state.
    ///
    /// Parent directories are created as needed. The file is written
    /// to a uniquely named temporary sibling first and renamed into
    /// place, so concurrent savers never share a temp file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or any file operation fails.
    pub fn save(&self, strategy: &MatrixStrategy) -> Result<(), StoreError> {
        let document = capture(strategy)?;
        let json = serde_json::to_string_pretty(&document)?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        tracing::debug!(path = %self.path.display(), views = document.views.len(), "Saved state");
        Ok(())
    }

    fn read_document(&self) -> Result<StateDocument, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No state file, starting empty");
            return Ok(StateDocument::default());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::parse(&self.path, e))
    }
}

type Materialized = (Option<GrantTable>, BTreeMap<ViewName, View>, LoadReport);

fn materialize(
    document: StateDocument,
    catalog: &dyn PermissionCatalog,
) -> Result<Materialized, StoreError> {
    let mut report = LoadReport::default();

    let global = document.global.map(|records| {
        let decoded = codec::decode(&records, catalog);
        report.absorb("global", decoded.warnings);
        decoded.table
    });

    let mut views = BTreeMap::new();
    for view in document.views {
        let name = ViewName::try_new(view.name.clone()).map_err(|source| {
            StoreError::InvalidViewName {
                name: view.name.clone(),
                source,
            }
        })?;
        if views.contains_key(&name) {
            return Err(StoreError::DuplicateView { name: view.name });
        }

        let mut matrix = None;
        let mut foreign = Vec::new();
        for property in view.properties {
            if !property.is_matrix() {
                foreign.push(property);
            } else if matrix.is_some() {
                return Err(StoreError::DuplicateViewTable { name: view.name });
            } else {
                matrix = Some(property);
            }
        }

        let entry = match matrix {
            Some(property) => {
                let records = property.records().map_err(|source| StoreError::MalformedMatrix {
                    name: view.name.clone(),
                    source,
                })?;
                let decoded = codec::decode(&records, catalog);
                report.absorb(&format!("view '{name}'"), decoded.warnings);
                View::with_table(name.clone(), decoded.table)
            }
            None => View::new(name.clone()),
        };
        views.insert(name, entry.with_foreign_properties(foreign));
    }

    if !report.is_clean() {
        tracing::warn!(
            skipped = report.warnings.len(),
            "Some persisted grant records could not be loaded"
        );
    }
    Ok((global, views, report))
}

// The matrix property, when present, is written first.
fn capture(strategy: &MatrixStrategy) -> Result<StateDocument, StoreError> {
    let (global, views) = strategy.snapshot();
    let mut documents = Vec::with_capacity(views.len());
    for view in views {
        let mut properties = Vec::with_capacity(view.foreign_properties().len() + 1);
        if let Some(table) = view.table() {
            properties.push(PropertyDocument::matrix(codec::encode(table))?);
        }
        properties.extend(view.foreign_properties().iter().cloned());
        documents.push(ViewDocument {
            name: view.name().to_string(),
            properties,
        });
    }
    Ok(StateDocument {
        global: global.map(|t| codec::encode(&t)),
        views: documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use vmatrix_auth::{builtin, StaticCatalog};
    use vmatrix_types::{assert_error_codes, ErrorCode, Sid};

    fn strategy() -> MatrixStrategy {
        MatrixStrategy::new(Arc::new(StaticCatalog::builtin()))
    }

    fn write(dir: &TempDir, value: serde_json::Value) -> StateStore {
        let path = dir.path().join("state.json");
        std::fs::write(&path, value.to_string()).expect("write state");
        StateStore::new(path)
    }

    fn sid(s: &str) -> Sid {
        Sid::try_new(s.to_string()).expect("valid sid")
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = TempDir::new().expect("tempdir");
        let s = strategy();
        let report = StateStore::new(dir.path().join("none.json"))
            .load_into(&s)
            .expect("load");
        assert!(report.is_clean());
        assert!(s.global_table().is_none());
        assert!(s.view_names().is_empty());
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let catalog = StaticCatalog::builtin();

        let original = strategy();
        let mut global = GrantTable::new();
        global.grant(&catalog.resolve(builtin::ADMINISTER).expect("admin"), sid("admin1"));
        original.set_global_table(global);
        for name in ["ops", "dev"] {
            original.add_view(ViewName::try_new(name.to_string()).expect("name"));
        }
        original
            .edit_view_table("ops", |t| {
                t.grant(&catalog.resolve(builtin::VIEW_READ).expect("read"), sid("alice"));
                t.set_blocks_inheritance(true);
            })
            .expect("registered");
        store.save(&original).expect("save");

        let restored = strategy();
        let report = store.load_into(&restored).expect("load");
        assert!(report.is_clean());
        assert_eq!(restored.view_names(), original.view_names());
        assert_eq!(
            restored.view_table("ops").expect("ops"),
            original.view_table("ops").expect("ops")
        );
        assert!(restored.view_table("dev").expect("dev").is_none());
        assert_eq!(restored.global_table(), original.global_table());
    }

    #[test]
    fn unknown_permissions_are_reported_not_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(
            &dir,
            json!({
                "global": [
                    { "tag": "permission", "value": "Removed.Thing:alice" },
                    { "tag": "permission", "value": "Overall.Read:alice" }
                ],
                "views": [{
                    "name": "ops",
                    "properties": [{
                        "kind": "matrix-authorization",
                        "records": [{ "tag": "permission", "value": "broken" }]
                    }]
                }]
            }),
        );

        let s = strategy();
        let report = store.load_into(&s).expect("load");
        assert_eq!(report.warnings().len(), 2);
        assert_eq!(report.warnings()[0].0, "global");
        assert_eq!(report.warnings()[1].0, "view 'ops'");
        assert_eq!(s.global_table().expect("global").len(), 1);
        assert!(s.view_table("ops").expect("ops").expect("table").is_empty());
    }

    #[test]
    fn legacy_view_records_load() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(
            &dir,
            json!({
                "views": [{
                    "name": "ops",
                    "properties": [{
                        "kind": "matrix-authorization",
                        "records": [
                            { "tag": "grantedPermissions", "children": [
                                { "tag": "entry", "children": [
                                    { "tag": "permission", "value": "View.Read" },
                                    { "tag": "set", "children": [{ "tag": "string", "value": "bob" }] }
                                ]}
                            ]},
                            { "tag": "blocksInheritance", "value": "true" }
                        ]
                    }]
                }]
            }),
        );

        let s = strategy();
        assert!(store.load_into(&s).expect("load").is_clean());
        let table = s.view_table("ops").expect("ops").expect("table");
        assert!(table.blocks_inheritance());
        assert_eq!(table.all_sids(), vec![sid("bob")]);
    }

    #[test]
    fn other_property_kinds_do_not_become_tables() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(
            &dir,
            json!({
                "views": [{
                    "name": "ops",
                    "properties": [{ "kind": "column-layout", "columns": ["name"] }]
                }]
            }),
        );
        let s = strategy();
        store.load_into(&s).expect("load");
        assert!(s.view_table("ops").expect("ops").is_none());
    }

    #[test]
    fn other_property_kinds_survive_save() {
        let dir = TempDir::new().expect("tempdir");
        let layout = json!({ "kind": "column-layout", "columns": ["name", "status"] });
        let store = write(
            &dir,
            json!({
                "views": [{
                    "name": "ops",
                    "properties": [
                        layout.clone(),
                        { "kind": "matrix-authorization", "records": [] }
                    ]
                }]
            }),
        );
        let catalog = StaticCatalog::builtin();
        let s = strategy();
        store.load_into(&s).expect("load");
        s.edit_view_table("ops", |t| {
            t.grant(&catalog.resolve(builtin::VIEW_READ).expect("read"), sid("alice"));
        })
        .expect("registered");
        store.save(&s).expect("save");

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).expect("read")).expect("json");
        assert_eq!(
            saved["views"][0]["properties"],
            json!([
                {
                    "kind": "matrix-authorization",
                    "records": [{ "tag": "permission", "value": "View.Read:alice" }]
                },
                layout
            ])
        );
    }

    #[test]
    fn malformed_matrix_fails_load() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(
            &dir,
            json!({
                "views": [{
                    "name": "ops",
                    "properties": [{ "kind": "matrix-authorization", "records": "oops" }]
                }]
            }),
        );
        let err = store.load_into(&strategy()).unwrap_err();
        assert_eq!(err.code(), "STORE_MALFORMED_MATRIX");
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::new(dir.path().join("state.json"));
        let s = strategy();
        s.add_view(ViewName::try_new("ops".to_string()).expect("name"));
        store.save(&s).expect("save");
        store.save(&s).expect("save again");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["state.json"]);
    }

    #[test]
    fn two_matrices_on_one_view_fail_load() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(
            &dir,
            json!({
                "views": [{
                    "name": "ops",
                    "properties": [
                        { "kind": "matrix-authorization", "records": [] },
                        { "kind": "matrix-authorization", "records": [] }
                    ]
                }]
            }),
        );

        let s = strategy();
        s.add_view(ViewName::try_new("keep".to_string()).expect("name"));
        let err = store.load_into(&s).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateViewTable { ref name } if name == "ops"));
        // Failed loads leave existing state alone.
        assert_eq!(s.view_names().len(), 1);
    }

    #[test]
    fn duplicate_and_invalid_view_names_fail_load() {
        let dir = TempDir::new().expect("tempdir");
        let store = write(&dir, json!({ "views": [{ "name": "a" }, { "name": "a" }] }));
        assert!(matches!(
            store.load_into(&strategy()).unwrap_err(),
            StoreError::DuplicateView { .. }
        ));

        let store = write(&dir, json!({ "views": [{ "name": " a" }] }));
        assert!(matches!(
            store.load_into(&strategy()).unwrap_err(),
            StoreError::InvalidViewName { .. }
        ));
    }

    #[test]
    fn garbage_file_is_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").expect("write");
        let err = StateStore::new(path).load_into(&strategy()).unwrap_err();
        assert_eq!(err.code(), "STORE_PARSE");
    }

    #[test]
    fn saved_file_uses_record_format() {
        let dir = TempDir::new().expect("tempdir");
        let store = StateStore::new(dir.path().join("state.json"));
        let s = strategy();
        s.add_view(ViewName::try_new("ops".to_string()).expect("name"));
        s.edit_view_table("ops", |t| t.set_blocks_inheritance(true))
            .expect("registered");
        store.save(&s).expect("save");

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).expect("read")).expect("json");
        assert_eq!(
            saved,
            json!({
                "global": null,
                "views": [{
                    "name": "ops",
                    "properties": [{
                        "kind": "matrix-authorization",
                        "records": [{ "tag": "blocksInheritance", "value": "true" }]
                    }]
                }]
            })
        );
    }

    #[test]
    fn error_codes() {
        assert_error_codes(
            &[
                StoreError::io("x", std::io::Error::other("boom")),
                StoreError::DuplicateView { name: "a".into() },
                StoreError::DuplicateViewTable { name: "a".into() },
            ],
            "STORE_",
        );
    }
}
