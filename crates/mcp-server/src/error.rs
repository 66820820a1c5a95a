use eidetic_indexer::IndexerError;
use eidetic_protocol::ErrorCategory;
use eidetic_search::SearchError;
use eidetic_vectorstore::VectorStoreError;
use thiserror::Error;

/// Maps every failure a tool handler can produce onto the abstract
/// categories in `eidetic_protocol::ErrorCategory` (spec.md §7), so the RPC
/// layer can attach a stable tag without each handler doing it by hand.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::Indexer(IndexerError::EmptyTree) => ErrorCategory::EmptyTree,
            Self::Indexer(IndexerError::NotIndexed) => ErrorCategory::NotIndexed,
            Self::Indexer(IndexerError::Embedding(_)) => ErrorCategory::Embedding,
            Self::Indexer(IndexerError::VectorStore(_)) => ErrorCategory::VectorStore,
            Self::Indexer(IndexerError::Io(_) | IndexerError::Snapshot(_)) => ErrorCategory::Io,
            Self::Search(SearchError::NotIndexed) => ErrorCategory::NotIndexed,
            Self::Search(SearchError::Embedding(_)) => ErrorCategory::Embedding,
            Self::Search(SearchError::VectorStore(_)) => ErrorCategory::VectorStore,
            Self::VectorStore(_) => ErrorCategory::VectorStore,
            Self::Io(_) => ErrorCategory::Io,
        }
    }
}
