//! Error types for pgrelay-sql

use thiserror::Error;

/// Result type alias for fragment construction and compilation.
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while assembling or compiling SQL fragments.
///
/// Both variants indicate a programming error in the code that builds SQL, never bad user
/// input: user-supplied values only ever reach SQL through [`crate::value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    /// A template hole was not backed by a trusted fragment.
    #[error("Untrusted interpolation at hole {index}: {message}")]
    UntrustedInterpolation { index: usize, message: String },

    /// A trusted node that cannot be rendered as SQL.
    #[error("Invalid node: {0}")]
    InvalidNode(String),
}

impl SqlError {
    /// Create an untrusted interpolation error for the given hole.
    pub fn untrusted(index: usize, message: impl Into<String>) -> Self {
        Self::UntrustedInterpolation {
            index,
            message: message.into(),
        }
    }

    /// Create an invalid node error.
    pub fn invalid_node(message: impl Into<String>) -> Self {
        Self::InvalidNode(message.into())
    }

    /// Check if this is an invalid node error
    pub fn is_invalid_node(&self) -> bool {
        matches!(self, Self::InvalidNode(_))
    }

    /// Check if this is an untrusted interpolation error
    pub fn is_untrusted_interpolation(&self) -> bool {
        matches!(self, Self::UntrustedInterpolation { .. })
    }
}
