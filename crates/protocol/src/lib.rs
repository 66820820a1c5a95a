//! Shared wire types for the eidetic code-search engine.
//!
//! Every crate that crosses a process or serialization boundary (the RPC
//! server, the indexer's on-disk snapshots, the vector-store adapter)
//! speaks these types rather than inventing its own.

mod error;
mod model;
mod rpc;

pub use error::{ErrorCategory, ProtocolError};
pub use model::{
    Chunk, Document, FileCategory, FileRecord, RunState, RunStateKind, SearchResult, Snapshot,
};
pub use rpc::{RpcError, RpcRequest, RpcResponse};

/// Serialize a value to a single-line JSON string (no trailing newline).
///
/// The line-delimited RPC transport (spec.md §6) appends its own `\n`; this
/// keeps serialization and framing concerns separate.
pub fn serialize_line<T: serde::Serialize>(value: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(value).map_err(ProtocolError::from)
}
