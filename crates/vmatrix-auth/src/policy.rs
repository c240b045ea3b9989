//! Per-view fallback policy.
//!
//! Decides which tables an evaluation consults. The chain is at most
//! two deep: the view's own table, then the global table.
//!
//! | Local table | Blocks inheritance | Global table | Policy |
//! |-------------|--------------------|--------------|--------|
//! | yes | yes | any | [`LocalOnly`](ResourcePolicy::LocalOnly) |
//! | yes | no | yes | [`LocalThenGlobal`](ResourcePolicy::LocalThenGlobal) |
//! | yes | no | no | [`LocalOnly`](ResourcePolicy::LocalOnly) |
//! | no | - | yes | [`GlobalOnly`](ResourcePolicy::GlobalOnly) |
//! | no | - | no | [`DenyAll`](ResourcePolicy::DenyAll) |

use crate::grant::GrantTable;

/// Which tables an evaluation consults, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourcePolicy {
    /// Only the view's own table.
    LocalOnly,
    /// The view's table, then the global table.
    LocalThenGlobal,
    /// No local table: the global table alone.
    GlobalOnly,
    /// No table at all: every check is denied.
    #[default]
    DenyAll,
}

impl ResourcePolicy {
    /// Selects the policy for a view.
    #[must_use]
    pub fn decide(local: Option<&GrantTable>, has_global: bool) -> Self {
        match (local, has_global) {
            (Some(table), true) if !table.blocks_inheritance() => Self::LocalThenGlobal,
            (Some(_), _) => Self::LocalOnly,
            (None, true) => Self::GlobalOnly,
            (None, false) => Self::DenyAll,
        }
    }

    /// Returns `true` if the global table takes part in evaluation.
    #[must_use]
    pub fn consults_global(self) -> bool {
        matches!(self, Self::LocalThenGlobal | Self::GlobalOnly)
    }
}
