use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// *EmbeddingError* (spec.md §7): provider exhaustion or a dimension
/// mismatch. Both are fatal for the current operation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding cache used before initialize() completed")]
    NotReady,

    #[error("embedding provider error (status {status:?}) after retries: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("disk cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("disk cache entry could not be parsed as JSON: {0}")]
    CacheCorrupt(String),
}
