//! On-disk layout of the state file.
//!
//! ```json
//! {
//!   "global": [ { "tag": "permission", "value": "Overall.Administer:admin1" } ],
//!   "views": [
//!     {
//!       "name": "ops",
//!       "properties": [
//!         { "kind": "matrix-authorization", "records": [ ... ] },
//!         { "kind": "column-layout", "records": [ ... ] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Properties of other kinds belong to other plugins. They are kept
//! as opaque JSON and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vmatrix_auth::Node;

const RECORDS_FIELD: &str = "records";

/// Property kind carrying a view's grant records.
pub const MATRIX_PROPERTY_KIND: &str = "matrix-authorization";

/// The whole state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Global grant records; `null` when there is no global table.
    #[serde(default)]
    pub global: Option<Vec<Node>>,

    /// Registered views.
    #[serde(default)]
    pub views: Vec<ViewDocument>,
}

/// One view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDocument {
    pub name: String,

    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
}

/// One property attached to a view.
///
/// Only `kind` is interpreted; every other field is carried in `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub kind: String,

    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl PropertyDocument {
    /// Returns `true` for the grant-table property.
    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.kind == MATRIX_PROPERTY_KIND
    }

    /// Wraps grant records in a matrix property.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a record cannot be converted.
    pub fn matrix(records: Vec<Node>) -> Result<Self, serde_json::Error> {
        let mut body = Map::new();
        body.insert(RECORDS_FIELD.to_string(), serde_json::to_value(records)?);
        Ok(Self {
            kind: MATRIX_PROPERTY_KIND.to_string(),
            body,
        })
    }

    /// The property's grant records. A missing `records` field is empty.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error if `records` is not a list of nodes.
    pub fn records(&self) -> Result<Vec<Node>, serde_json::Error> {
        match self.body.get(RECORDS_FIELD) {
            Some(value) => Vec::<Node>::deserialize(value),
            None => Ok(Vec::new()),
        }
    }
}
