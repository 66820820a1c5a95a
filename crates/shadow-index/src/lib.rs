//! Editor stop-hook shadow index + targeted reindexer (spec.md §6
//! "Shadow-index hook"). A session's uncommitted edits live in a shadow git
//! index under the repo's gitdir; on the editor's `Stop` event this turns
//! that index into a real (unreferenced-from-HEAD) commit and dispatches a
//! detached subprocess that reindexes exactly the files the commit touched.

pub mod error;
pub mod hook;
pub mod reindex;

pub use error::{Result, ShadowIndexError};
