//! Error types for SimpleJSON protocol operations

use thiserror::Error;

/// Result type for SimpleJSON operations
pub type SimpleJsonResult<T> = Result<T, SimpleJsonError>;

/// Everything that can abort the handling of a single protocol request
#[derive(Error, Debug)]
pub enum SimpleJsonError {
    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown query type {0:?}, timeserie or table")]
    UnknownTargetKind(String),

    #[error("all columns must be of equal length: column {column:?} has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid column type {0:?}")]
    InvalidColumnType(String),

    #[error("invalid tag type {0:?}")]
    InvalidTagType(String),

    /// A collaborator reported a failure
    #[error("{0}")]
    Datasource(String),

    /// The capability needed to answer the request is not wired
    #[error("{0} is not implemented by this datasource")]
    NotImplemented(&'static str),
}

impl SimpleJsonError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode(message.into())
    }

    /// Create a new datasource error
    pub fn datasource<S: Into<String>>(message: S) -> Self {
        Self::Datasource(message.into())
    }

    /// Get the error category for logging and status mapping
    pub fn category(&self) -> &'static str {
        match self {
            SimpleJsonError::Decode(_) | SimpleJsonError::Json(_) => "decode",
            SimpleJsonError::UnknownTargetKind(_) => "unknown_target_kind",
            SimpleJsonError::ColumnLengthMismatch { .. } => "column_length_mismatch",
            SimpleJsonError::InvalidColumnType(_) => "invalid_column_type",
            SimpleJsonError::InvalidTagType(_) => "invalid_tag_type",
            SimpleJsonError::Datasource(_) => "datasource",
            SimpleJsonError::NotImplemented(_) => "not_implemented",
        }
    }

    /// Treat any error returned by a collaborator as a datasource failure,
    /// keeping its message. An absent capability stays `NotImplemented`.
    pub fn into_datasource(self) -> Self {
        match self {
            err @ (SimpleJsonError::Datasource(_) | SimpleJsonError::NotImplemented(_)) => err,
            other => SimpleJsonError::Datasource(other.to_string()),
        }
    }

    /// True when the request body itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SimpleJsonError::Decode(_)
                | SimpleJsonError::Json(_)
                | SimpleJsonError::UnknownTargetKind(_)
        )
    }
}
