use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// *VectorStoreError* (spec.md §7): any adapter operation failure. Carries
/// the underlying cause as a string rather than a boxed `dyn Error` so it
/// stays `Send + Sync + 'static` across the async boundary without extra
/// bounds gymnastics.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("collection {0:?} already exists")]
    CollectionExists(String),

    #[error("collection {0:?} does not exist")]
    CollectionMissing(String),

    #[error("transport error talking to vector store: {0}")]
    Transport(String),

    #[error("vector store returned an unexpected response: {0}")]
    Protocol(String),

    #[error("insert batch partially failed: {0}")]
    PartialInsert(String),
}

impl VectorStoreError {
    #[must_use]
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}
