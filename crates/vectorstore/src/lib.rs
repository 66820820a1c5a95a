//! The vector-store adapter contract (spec.md §4.4): a narrow capability
//! set shared by all backends, plus the blended RRF fusion (spec.md §4.3
//! steps 4-6) that backs every backend's `search` method.

mod error;
pub mod fusion;
mod http;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod store;

pub use error::{Result, VectorStoreError};
pub use http::{HttpVectorStore, HttpVectorStoreConfig, DEFAULT_CALL_TIMEOUT};
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryVectorStore;
pub use store::{SearchQuery, SymbolQuery, SymbolRow, VectorStore, LIST_SYMBOLS_LIMIT};
