use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Abstract error category shared across crates (spec.md §7).
///
/// These are *categories*, not concrete error types — each crate defines its
/// own `thiserror` enum and maps into this one only at the RPC boundary,
/// where the caller needs a stable, serializable tag rather than a Rust
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Config,
    NotIndexed,
    EmptyTree,
    Embedding,
    VectorStore,
    Io,
    InvalidRequest,
    Internal,
}

impl ErrorCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config_error",
            Self::NotIndexed => "not_indexed",
            Self::EmptyTree => "empty_tree",
            Self::Embedding => "embedding_error",
            Self::VectorStore => "vector_store_error",
            Self::Io => "io_error",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
