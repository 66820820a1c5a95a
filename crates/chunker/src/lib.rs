mod error;
mod language;
mod splitter;

pub use error::{ChunkerError, Result};
pub use language::Language;
pub use splitter::{split, MAX_CHUNK_CHARS};

pub use eidetic_protocol::Chunk;
