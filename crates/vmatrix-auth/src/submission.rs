//! Configuration-form ingestion.
//!
//! The view configuration screen posts a JSON object:
//!
//! ```text
//! {
//!   "blocksInheritance": {} | null | true | false,   (optional)
//!   "data": {
//!     "<sid>": { "<permissionId>": true | false, ... },
//!     ...
//!   }
//! }
//! ```
//!
//! A submission is all-or-nothing. Every structural problem rejects the
//! whole form and no table is produced.

use crate::catalog::PermissionCatalog;
use crate::grant::GrantTable;
use serde_json::{Map, Value};
use thiserror::Error;
use vmatrix_types::{ErrorCode, IdError, Sid, TryNew};

const BLOCKS_INHERITANCE_FIELD: &str = "blocksInheritance";
const DATA_FIELD: &str = "data";

/// A rejected form submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// A value that must be an object was something else.
    #[error("not an object: {field}")]
    NotAnObject { field: String },

    /// A permission flag was not a boolean.
    #[error("not a boolean: {sid}/{permission}")]
    NotABoolean { sid: String, permission: String },

    /// The inheritance checkbox had an unexpected shape.
    #[error("invalid value for blocksInheritance: {value}")]
    InvalidBlocksInheritance { value: String },

    /// The form names a permission the catalog does not know.
    #[error("unknown permission: {id}")]
    UnknownPermission { id: String },

    /// A principal name was rejected.
    #[error("invalid principal: {0}")]
    InvalidSid(#[from] IdError),
}

impl ErrorCode for SubmissionError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject { .. } => "FORM_NOT_AN_OBJECT",
            Self::NotABoolean { .. } => "FORM_NOT_A_BOOLEAN",
            Self::InvalidBlocksInheritance { .. } => "FORM_INVALID_BLOCKS_INHERITANCE",
            Self::UnknownPermission { .. } => "FORM_UNKNOWN_PERMISSION",
            Self::InvalidSid(_) => "FORM_INVALID_SID",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Builds a fresh [`GrantTable`] from a submitted form.
///
/// Only flags set to `true` produce grants.
///
/// # Errors
///
/// Returns [`SubmissionError`] if the form is not an object, `data` or a
/// per-principal block is not an object, a flag is not a boolean, a
/// principal name is empty, or a permission id is unknown.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use vmatrix_auth::{parse_submission, StaticCatalog};
///
/// let form = json!({
///     "blocksInheritance": {},
///     "data": {
///         "alice": { "View.Read": true, "View.Delete": false },
///     }
/// });
///
/// let table = parse_submission(&form, &StaticCatalog::builtin()).unwrap();
/// assert!(table.blocks_inheritance());
/// assert_eq!(table.len(), 1);
/// ```
pub fn parse_submission(
    form: &Value,
    catalog: &dyn PermissionCatalog,
) -> Result<GrantTable, SubmissionError> {
    let form = as_object(form, "form")?;

    let mut table = GrantTable::new();
    table.set_blocks_inheritance(blocks_inheritance(form.get(BLOCKS_INHERITANCE_FIELD))?);

    let Some(data) = form.get(DATA_FIELD) else {
        return Ok(table);
    };
    for (sid, flags) in as_object(data, DATA_FIELD)? {
        let flags = as_object(flags, sid)?;
        let sid = Sid::try_new(sid.clone())?;
        for (permission, flag) in flags {
            let granted = flag.as_bool().ok_or_else(|| SubmissionError::NotABoolean {
                sid: sid.to_string(),
                permission: permission.clone(),
            })?;
            if !granted {
                continue;
            }
            let resolved = catalog
                .resolve(permission)
                .ok_or_else(|| SubmissionError::UnknownPermission {
                    id: permission.clone(),
                })?;
            table.grant(&resolved, sid.clone());
        }
    }

    tracing::debug!(
        grants = table.len(),
        blocks_inheritance = table.blocks_inheritance(),
        "Parsed form submission"
    );
    Ok(table)
}

/// Validates a principal name typed into the "add user or group" field.
///
/// Surrounding whitespace is removed.
///
/// # Errors
///
/// Returns [`SubmissionError::InvalidSid`] if nothing is left after trimming.
pub fn check_sid_name(name: &str) -> Result<Sid, SubmissionError> {
    Ok(Sid::try_new(name.trim().to_string())?)
}

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, SubmissionError> {
    value.as_object().ok_or_else(|| SubmissionError::NotAnObject {
        field: field.to_string(),
    })
}

// The checkbox posts an empty object when ticked and null otherwise.
fn blocks_inheritance(value: Option<&Value>) -> Result<bool, SubmissionError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Object(_)) => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(SubmissionError::InvalidBlocksInheritance {
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{builtin, StaticCatalog};
    use serde_json::json;
    use vmatrix_types::assert_error_codes;

    fn parse(form: Value) -> Result<GrantTable, SubmissionError> {
        parse_submission(&form, &StaticCatalog::builtin())
    }

    #[test]
    fn true_flags_become_grants() {
        let table = parse(json!({
            "data": {
                "alice": { "View.Read": true, "View.Configure": false },
                "bob": { "Overall.Administer": true },
                "anonymous": { "View.Read": true },
            }
        }))
        .expect("valid form");

        let catalog = StaticCatalog::builtin();
        let read = catalog.resolve(builtin::VIEW_READ).expect("read");
        let configure = catalog.resolve(builtin::VIEW_CONFIGURE).expect("configure");

        assert_eq!(table.len(), 3);
        assert!(table.is_granted_explicit("alice", &read));
        assert!(!table.is_granted_explicit("alice", &configure));
        assert!(table.has_permission("bob", &read));
        assert!(table.is_granted_explicit("anonymous", &read));
        assert!(!table.blocks_inheritance());
    }

    #[test]
    fn blocks_inheritance_shapes() {
        assert!(parse(json!({ "blocksInheritance": {} })).expect("object").blocks_inheritance());
        assert!(parse(json!({ "blocksInheritance": true })).expect("true").blocks_inheritance());
        assert!(!parse(json!({ "blocksInheritance": false })).expect("false").blocks_inheritance());
        assert!(!parse(json!({ "blocksInheritance": null })).expect("null").blocks_inheritance());
        assert!(!parse(json!({})).expect("absent").blocks_inheritance());

        let err = parse(json!({ "blocksInheritance": "yes" })).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidBlocksInheritance { .. }));
    }

    #[test]
    fn missing_data_is_empty_table() {
        let table = parse(json!({ "blocksInheritance": {} })).expect("valid form");
        assert!(table.is_empty());
    }

    #[test]
    fn non_object_form_is_rejected() {
        let err = parse(json!([1, 2])).unwrap_err();
        assert_eq!(err, SubmissionError::NotAnObject { field: "form".into() });
    }

    #[test]
    fn non_object_data_is_rejected() {
        let err = parse(json!({ "data": "alice" })).unwrap_err();
        assert_eq!(err, SubmissionError::NotAnObject { field: "data".into() });
    }

    #[test]
    fn non_object_sid_block_is_rejected() {
        let err = parse(json!({ "data": { "alice": true } })).unwrap_err();
        assert_eq!(err, SubmissionError::NotAnObject { field: "alice".into() });
    }

    #[test]
    fn non_boolean_flag_rejects_whole_form() {
        let err = parse(json!({
            "data": {
                "alice": { "View.Read": true },
                "bob": { "View.Read": "on" },
            }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SubmissionError::NotABoolean {
                sid: "bob".into(),
                permission: "View.Read".into()
            }
        );
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let err = parse(json!({ "data": { "alice": { "Job.Build": true } } })).unwrap_err();
        assert_eq!(err, SubmissionError::UnknownPermission { id: "Job.Build".into() });
    }

    #[test]
    fn unknown_permission_with_false_flag_is_ignored() {
        let table = parse(json!({ "data": { "alice": { "Job.Build": false } } })).expect("valid");
        assert!(table.is_empty());
    }

    #[test]
    fn empty_sid_is_rejected() {
        let err = parse(json!({ "data": { "": { "View.Read": true } } })).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidSid(IdError::Empty { .. })));
    }

    #[test]
    fn check_sid_name_trims() {
        assert_eq!(check_sid_name("  alice ").expect("valid").as_str(), "alice");
        assert!(check_sid_name("   ").is_err());
    }

    #[test]
    fn error_codes() {
        assert_error_codes(
            &[
                SubmissionError::NotAnObject { field: "data".into() },
                SubmissionError::NotABoolean {
                    sid: "a".into(),
                    permission: "b".into(),
                },
                SubmissionError::InvalidBlocksInheritance { value: "1".into() },
                SubmissionError::UnknownPermission { id: "x".into() },
                SubmissionError::InvalidSid(IdError::Empty { kind: "principal" }),
            ],
            "FORM_",
        );
    }
}
