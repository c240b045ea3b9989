//! Persisted grant records.
//!
//! A grant table is stored as a list of child [`Node`]s under the owning
//! view (or under the global strategy):
//!
//! ```text
//! blocksInheritance = "true"            (only when the flag is set)
//! permission        = "View.Read:alice"
//! permission        = "Overall.Administer:admin1"
//! ```
//!
//! # Legacy format
//!
//! Older data was written as a field dump of the table structure:
//!
//! ```text
//! grantedPermissions
//!   entry
//!     permission = "View.Read"
//!     set
//!       string = "alice"
//! sids
//!   string = "alice"
//! blocksInheritance = "false"
//! ```
//!
//! [`detect_format`] peeks at the first child tag and [`decode`] picks
//! the matching reader. Both readers are permanent.
//!
//! # Robustness
//!
//! Decoding never fails. A record naming a permission the catalog no
//! longer knows, or one that cannot be parsed, is skipped and reported
//! as a [`DecodeWarning`]; the remaining records still load.

use crate::catalog::PermissionCatalog;
use crate::grant::GrantTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vmatrix_types::{ErrorCode, PermissionId, Sid, TryNew};

/// Tag of a grant record.
pub const GRANT_TAG: &str = "permission";

/// Tag of the inheritance-blocking marker.
pub const BLOCKS_INHERITANCE_TAG: &str = "blocksInheritance";

const LEGACY_GRANTS_TAG: &str = "grantedPermissions";
const LEGACY_ENTRY_TAG: &str = "entry";
const LEGACY_SIDS_TAG: &str = "sids";

/// One persisted element: a tag with an optional text value and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Element name.
    pub tag: String,

    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Nested elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a text element.
    #[must_use]
    pub fn leaf(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Creates an element with children.
    #[must_use]
    pub fn branch(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            tag: tag.into(),
            value: None,
            children,
        }
    }

    fn text(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim)
    }
}

/// A typed grant-table record.
///
/// The inheritance marker is its own variant, so a permission that
/// happens to be called `blocksInheritance` cannot be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// The table blocks inheritance.
    BlocksInheritance,
    /// One `(permission, principal)` grant.
    Grant {
        /// Granted permission.
        permission: PermissionId,
        /// Principal receiving it.
        sid: Sid,
    },
}

impl Record {
    /// The `"<permissionId>:<principal>"` form of a grant record.
    #[must_use]
    pub fn short_form(&self) -> Option<String> {
        match self {
            Self::BlocksInheritance => None,
            Self::Grant { permission, sid } => Some(format!("{permission}:{sid}")),
        }
    }

    /// Converts the record to its persisted node.
    #[must_use]
    pub fn to_node(&self) -> Node {
        match self.short_form() {
            Some(grant) => Node::leaf(GRANT_TAG, grant),
            None => Node::leaf(BLOCKS_INHERITANCE_TAG, "true"),
        }
    }
}

/// Which reader applies to a list of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// `blocksInheritance` / `permission` records.
    Matrix,
    /// Field dump written by older versions.
    Legacy,
}

/// Picks the reader for `nodes` by looking at the first tag only.
///
/// An empty list is an empty matrix table.
#[must_use]
pub fn detect_format(nodes: &[Node]) -> RecordFormat {
    match nodes.first().map(|n| n.tag.as_str()) {
        None | Some(GRANT_TAG) | Some(BLOCKS_INHERITANCE_TAG) => RecordFormat::Matrix,
        Some(_) => RecordFormat::Legacy,
    }
}

/// A record that was skipped while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeWarning {
    /// The permission id is not in the catalog.
    #[error("skipping '{record}': no such permission '{permission}'")]
    UnknownPermission { record: String, permission: String },

    /// The record could not be parsed.
    #[error("skipping malformed record '{record}'")]
    MalformedRecord { record: String },

    /// The principal half of the record is empty.
    #[error("skipping '{record}': empty principal")]
    EmptySid { record: String },

    /// An element the reader does not understand.
    #[error("ignoring unknown element '{tag}'")]
    UnknownField { tag: String },
}

impl ErrorCode for DecodeWarning {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownPermission { .. } => "DECODE_UNKNOWN_PERMISSION",
            Self::MalformedRecord { .. } => "DECODE_MALFORMED_RECORD",
            Self::EmptySid { .. } => "DECODE_EMPTY_SID",
            Self::UnknownField { .. } => "DECODE_UNKNOWN_FIELD",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}

/// Result of [`decode`]: the table plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    /// The recovered table.
    pub table: GrantTable,
    /// Records dropped on the way.
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    /// Returns `true` if every record loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Encodes a table as typed records: the marker first, then grants
/// ordered by permission and principal.
#[must_use]
pub fn encode_records(table: &GrantTable) -> Vec<Record> {
    let marker = table
        .blocks_inheritance()
        .then_some(Record::BlocksInheritance);
    marker
        .into_iter()
        .chain(table.grants().map(|(permission, sid)| Record::Grant {
            permission: permission.id().clone(),
            sid: sid.clone(),
        }))
        .collect()
}

/// Encodes a table as persisted nodes.
#[must_use]
pub fn encode(table: &GrantTable) -> Vec<Node> {
    encode_records(table).iter().map(Record::to_node).collect()
}

/// Decodes persisted nodes in either format.
///
/// # Example
///
/// ```
/// use vmatrix_auth::{decode, Node, StaticCatalog};
///
/// let catalog = StaticCatalog::builtin();
/// let nodes = vec![
///     Node::leaf("permission", "View.Read:alice"),
///     Node::leaf("permission", "Job.Build:alice"),
///     Node::leaf("permission", "View.Delete:bob"),
/// ];
///
/// let decoded = decode(&nodes, &catalog);
/// assert_eq!(decoded.table.len(), 2);
/// assert_eq!(decoded.warnings.len(), 1);
/// ```
#[must_use]
pub fn decode(nodes: &[Node], catalog: &dyn PermissionCatalog) -> Decoded {
    let format = detect_format(nodes);
    tracing::debug!(?format, records = nodes.len(), "Decoding grant records");

    let mut decoder = Decoder {
        catalog,
        decoded: Decoded::default(),
    };
    match format {
        RecordFormat::Matrix => decoder.matrix(nodes),
        RecordFormat::Legacy => decoder.legacy(nodes),
    }
    decoder.decoded
}

struct Decoder<'a> {
    catalog: &'a dyn PermissionCatalog,
    decoded: Decoded,
}

impl Decoder<'_> {
    fn matrix(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node.tag.as_str() {
                BLOCKS_INHERITANCE_TAG => {
                    self.decoded
                        .table
                        .set_blocks_inheritance(node.text() == Some("true"));
                }
                GRANT_TAG => match node.value.as_deref() {
                    Some(short_form) => self.short_form(short_form),
                    None => self.skip(DecodeWarning::MalformedRecord {
                        record: String::new(),
                    }),
                },
                other => self.skip(DecodeWarning::UnknownField {
                    tag: other.to_string(),
                }),
            }
        }
    }

    fn short_form(&mut self, record: &str) {
        let Some((permission, sid)) = record.split_once(':') else {
            self.skip(DecodeWarning::MalformedRecord {
                record: record.to_string(),
            });
            return;
        };
        self.grant(record, permission, sid);
    }

    fn grant(&mut self, record: &str, permission: &str, sid: &str) {
        let Some(permission) = self.catalog.resolve(permission) else {
            self.skip(DecodeWarning::UnknownPermission {
                record: record.to_string(),
                permission: permission.to_string(),
            });
            return;
        };
        match Sid::try_new(sid.to_string()) {
            Ok(sid) => {
                self.decoded.table.grant(&permission, sid);
            }
            Err(_) => self.skip(DecodeWarning::EmptySid {
                record: record.to_string(),
            }),
        }
    }

    fn legacy(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node.tag.as_str() {
                LEGACY_GRANTS_TAG => {
                    for entry in &node.children {
                        self.legacy_entry(entry);
                    }
                }
                BLOCKS_INHERITANCE_TAG => {
                    self.decoded
                        .table
                        .set_blocks_inheritance(node.text() == Some("true"));
                }
                // Derived from the grants; nothing to read.
                LEGACY_SIDS_TAG => {}
                other => self.skip(DecodeWarning::UnknownField {
                    tag: other.to_string(),
                }),
            }
        }
    }

    fn legacy_entry(&mut self, entry: &Node) {
        let (key, sets) = match entry.children.split_first() {
            Some((key, sets)) if entry.tag == LEGACY_ENTRY_TAG => (key, sets),
            _ => {
                self.skip(DecodeWarning::MalformedRecord {
                    record: entry.tag.clone(),
                });
                return;
            }
        };
        let Some(permission) = key.text().filter(|p| !p.is_empty()) else {
            self.skip(DecodeWarning::MalformedRecord {
                record: key.tag.clone(),
            });
            return;
        };

        for set in sets {
            for sid in &set.children {
                let sid = sid.text().unwrap_or_default();
                let record = format!("{permission}:{sid}");
                self.grant(&record, permission, sid);
            }
        }
    }

    fn skip(&mut self, warning: DecodeWarning) {
        tracing::warn!(code = warning.code(), "{warning}");
        self.decoded.warnings.push(warning);
    }
}
