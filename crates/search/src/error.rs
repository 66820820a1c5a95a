use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Error taxonomy for a single `search` call (spec.md §7).
#[derive(Error, Debug)]
pub enum SearchError {
    /// *NotIndexedError*: the tree's collection does not exist.
    #[error("tree has not been indexed yet")]
    NotIndexed,

    #[error("embedding error: {0}")]
    Embedding(#[from] eidetic_embedding::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] eidetic_vectorstore::VectorStoreError),
}
