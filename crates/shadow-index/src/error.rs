use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShadowIndexError>;

/// Error taxonomy for the stop-hook and targeted reindexer (spec.md §7
/// categories, applied to the shadow-index subsystem specifically).
#[derive(Error, Debug)]
pub enum ShadowIndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("manifest (de)serialization error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("embedding error: {0}")]
    Embedding(#[from] eidetic_embedding::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] eidetic_vectorstore::VectorStoreError),
}
