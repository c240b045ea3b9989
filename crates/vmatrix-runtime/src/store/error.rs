//! State store errors.

use std::path::PathBuf;
use thiserror::Error;
use vmatrix_types::{ErrorCode, IdError};

/// Errors that can occur while loading or saving persisted state.
///
/// Individual unreadable grant records are not errors; they are
/// reported through [`LoadReport`](super::LoadReport).
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the state file.
    #[error("failed to access state file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file is not a valid document.
    #[error("failed to parse state file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the state failed.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A persisted view has an unusable name.
    #[error("invalid view name '{name}': {source}")]
    InvalidViewName {
        name: String,
        #[source]
        source: IdError,
    },

    /// Two persisted views share a name.
    #[error("view '{name}' is defined more than once")]
    DuplicateView { name: String },

    /// A persisted view carries more than one grant table.
    #[error("view '{name}' has more than one authorization matrix")]
    DuplicateViewTable { name: String },

    /// A view's authorization matrix does not hold grant records.
    #[error("view '{name}' has a malformed authorization matrix: {source}")]
    MalformedMatrix {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "STORE_IO",
            Self::Parse { .. } => "STORE_PARSE",
            Self::Serialize(_) => "STORE_SERIALIZE",
            Self::InvalidViewName { .. } => "STORE_INVALID_VIEW_NAME",
            Self::DuplicateView { .. } => "STORE_DUPLICATE_VIEW",
            Self::DuplicateViewTable { .. } => "STORE_DUPLICATE_VIEW_TABLE",
            Self::MalformedMatrix { .. } => "STORE_MALFORMED_MATRIX",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
