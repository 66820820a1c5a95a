use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

/// Error taxonomy for the indexer pipeline (spec.md §7). Per-file and
/// per-chunk errors never reach this type — they're contained as parse
/// failures inside `IndexResult`; only per-operation failures abort and
/// surface here.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// *EmptyTreeError*: scan returned no files.
    #[error("tree scan produced no files to index")]
    EmptyTree,

    /// *NotIndexedError*: the tree has no collection yet.
    #[error("tree has not been indexed yet")]
    NotIndexed,

    /// *IOError* during scan or snapshot persistence (fatal, unlike
    /// per-file read failures during split, which are contained).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding error: {0}")]
    Embedding(#[from] eidetic_embedding::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] eidetic_vectorstore::VectorStoreError),

    #[error("snapshot (de)serialization error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
