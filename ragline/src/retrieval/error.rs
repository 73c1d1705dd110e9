//! Retrieval index errors.

/// Error type for loading, building and querying the vector index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum IndexError {
    /// A vector does not have the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Index dimension.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// There is nothing to index.
    #[error("no passages to index")]
    Empty,

    /// The index file or corpus is malformed.
    #[error("invalid index data: {0}")]
    Format(String),

    /// An entry's embedding has zero (or non-finite) norm and cannot be
    /// compared by cosine similarity.
    #[error("entry {id} has a zero-norm embedding")]
    ZeroNorm {
        /// Entry ID.
        id: String,
    },
}

impl IndexError {
    /// Create a format error.
    #[must_use]
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}
