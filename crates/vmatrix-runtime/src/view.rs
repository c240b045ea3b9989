//! Registered views.

use crate::store::PropertyDocument;
use std::sync::Arc;
use vmatrix_auth::GrantTable;
use vmatrix_types::ViewName;

/// A named view and its optional grant table.
///
/// The table is shared: evaluation chains hold clones of the `Arc`
/// and keep working against the table they were resolved with after
/// the view moves on to a replacement.
///
/// Properties owned by other plugins ride along untouched so that
/// saving never drops them.
#[derive(Debug, Clone)]
pub struct View {
    name: ViewName,
    table: Option<Arc<GrantTable>>,
    foreign: Vec<PropertyDocument>,
}

impl View {
    /// Creates a view without a table.
    #[must_use]
    pub fn new(name: ViewName) -> Self {
        Self {
            name,
            table: None,
            foreign: Vec::new(),
        }
    }

    /// Creates a view with a table.
    #[must_use]
    pub fn with_table(name: ViewName, table: GrantTable) -> Self {
        Self {
            name,
            table: Some(Arc::new(table)),
            foreign: Vec::new(),
        }
    }

    /// Attaches properties of other kinds.
    #[must_use]
    pub fn with_foreign_properties(mut self, properties: Vec<PropertyDocument>) -> Self {
        self.foreign = properties;
        self
    }

    /// The view name.
    #[must_use]
    pub fn name(&self) -> &ViewName {
        &self.name
    }

    /// The view's own table, if it has one.
    #[must_use]
    pub fn table(&self) -> Option<&Arc<GrantTable>> {
        self.table.as_ref()
    }

    /// Properties of other kinds, in persisted order.
    #[must_use]
    pub fn foreign_properties(&self) -> &[PropertyDocument] {
        &self.foreign
    }

    /// Swaps in a new table, returning the previous one.
    pub fn replace_table(&mut self, table: Option<Arc<GrantTable>>) -> Option<Arc<GrantTable>> {
        std::mem::replace(&mut self.table, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmatrix_types::TryNew;

    fn name(s: &str) -> ViewName {
        ViewName::try_new(s.to_string()).expect("valid view name")
    }

    #[test]
    fn replace_returns_previous() {
        let mut view = View::with_table(name("ops"), GrantTable::new());
        let old = view.replace_table(None).expect("had a table");
        assert!(old.is_empty());
        assert!(view.table().is_none());
        assert!(view.foreign_properties().is_empty());
        assert_eq!(view.name().as_str(), "ops");
    }

    #[test]
    fn replaced_table_outlives_swap() {
        let mut table = GrantTable::new();
        table.set_blocks_inheritance(true);
        let mut view = View::with_table(name("ops"), table);

        let held = view.table().cloned().expect("table");
        view.replace_table(Some(Arc::new(GrantTable::new())));

        assert!(held.blocks_inheritance());
        assert!(!view.table().expect("table").blocks_inheritance());
    }

    #[test]
    fn table_swap_keeps_foreign_properties() {
        let layout: PropertyDocument =
            serde_json::from_value(serde_json::json!({ "kind": "column-layout" })).expect("parse");
        let mut view = View::new(name("ops")).with_foreign_properties(vec![layout.clone()]);

        view.replace_table(Some(Arc::new(GrantTable::new())));
        assert_eq!(view.foreign_properties(), &[layout][..]);
    }
}
