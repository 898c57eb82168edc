//! Error types for pgrelay

use crate::lock::Concern;
use pgrelay_sql::SqlError;
use thiserror::Error;

/// Result type alias for pgrelay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised while building or executing a query.
///
/// Everything except [`RelayError::Query`], [`RelayError::Decode`] and
/// [`RelayError::InvalidCursor`] indicates a programming error in the code that drives the
/// builder, not bad user input.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Fragment construction or compilation failed
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// A mutator was called after its concern locked
    #[error("Cannot mutate '{0}': it has already been locked")]
    LockedMutation(Concern),

    /// No named child registered under this name
    #[error("Unknown named child: {0}")]
    UnknownNamedChild(String),

    /// A named child with this name already exists
    #[error("Named child already exists: {0}")]
    DuplicateNamedChild(String),

    /// first/last/offset combined in an unsupported way
    #[error("Ambiguous pagination: {0}")]
    AmbiguousPagination(String),

    /// A cursor string could not be decoded
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl RelayError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an invalid cursor error
    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::InvalidCursor(message.into())
    }

    /// Create an ambiguous pagination error
    pub fn ambiguous_pagination(message: impl Into<String>) -> Self {
        Self::AmbiguousPagination(message.into())
    }

    /// Check if this is a locked mutation error
    pub fn is_locked_mutation(&self) -> bool {
        matches!(self, Self::LockedMutation(_))
    }

    /// Check if this is an unknown named child error
    pub fn is_unknown_named_child(&self) -> bool {
        matches!(self, Self::UnknownNamedChild(_))
    }

    /// Check if this is an ambiguous pagination error
    pub fn is_ambiguous_pagination(&self) -> bool {
        matches!(self, Self::AmbiguousPagination(_))
    }

    /// Check if this is an invalid cursor error
    pub fn is_invalid_cursor(&self) -> bool {
        matches!(self, Self::InvalidCursor(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for RelayError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
