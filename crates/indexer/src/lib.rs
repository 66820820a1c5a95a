//! Incremental indexer pipeline (spec.md §4.1): scan a tree, diff it against
//! its last snapshot, split changed files into chunks, embed and upsert
//! them, persist the new snapshot. Also owns the cross-cutting state the
//! rest of the service shares per tree: the project registry (§4.7), the
//! ephemeral run-state map (§3 "RunState"), and the per-tree FIFO mutex
//! (§5).

mod category;
mod error;
mod indexer;
mod mutex;
mod paths;
mod registry;
mod scanner;
mod snapshot;
mod state;

pub use category::classify_file_category;
pub use error::{IndexerError, Result};
pub use indexer::{
    IndexOptions, IndexResult, Indexer, DEFAULT_EMBEDDING_BATCH_SIZE, DEFAULT_INDEXING_CONCURRENCY,
};
pub use mutex::TreeMutexMap;
pub use paths::{collection_name, normalize_path};
pub use registry::{registry_path, ProjectRegistry};
pub use scanner::{parse_gitignore_patterns, scan_files, DEFAULT_EXTENSIONS, DEFAULT_IGNORE_GLOBS};
pub use snapshot::{
    build_snapshot, content_hash, diff_snapshots, read_snapshot, snapshot_path, write_snapshot_atomic,
    SnapshotDiff,
};
pub use state::StateMap;
