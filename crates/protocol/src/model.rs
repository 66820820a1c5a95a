use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file's classification, used for result re-weighting (spec.md §4.3/§4.6).
///
/// Ordering of the variants matters only insofar as `classify` (in
/// `eidetic-indexer`) checks them in a fixed "first match wins" order; the
/// enum itself carries no ordering semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Source,
    Test,
    Doc,
    Config,
    Generated,
}

impl FileCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Test => "test",
            Self::Doc => "doc",
            Self::Config => "config",
            Self::Generated => "generated",
        }
    }

    /// Multiplicative re-weighting applied to a result's fused score
    /// (spec.md §4.3 step 7). Absent/empty category is handled by the
    /// caller (falls back to 1.0), not here.
    #[must_use]
    pub const fn boost(self) -> f32 {
        match self {
            Self::Source => 1.0,
            Self::Test => 0.75,
            Self::Config => 0.70,
            Self::Doc => 0.65,
            Self::Generated => 0.60,
        }
    }
}

/// A snapshot entry: everything needed to detect whether a file changed
/// since the last index (spec.md §3 "FileRecord"). The relative path is the
/// key into `Snapshot`, not a field here — this matches the persisted shape
/// `{ [relativePath]: { contentHash } }` (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileRecord {
    pub content_hash: String,
}

/// Persisted mapping of relative path to content hash, used for incremental
/// diffs (spec.md §3 "Snapshot", §4.6).
pub type Snapshot = HashMap<String, FileRecord>;

/// A unit of content submitted to the embedder (spec.md §3 "Chunk").
///
/// Line numbers are 1-based inclusive; `content.len() <= MAX_CHUNK_CHARS`
/// (2500) after refinement (spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_symbol: Option<String>,
}

impl Chunk {
    /// A whitespace-only chunk must be dropped (spec.md §3 invariant 5).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// What the vector store actually holds: a `Chunk` plus its embedding and
/// store-level metadata (spec.md §3 "Document").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_symbol: Option<String>,
    pub vector: Vec<f32>,
    pub file_extension: String,
    pub file_category: FileCategory,
}

impl Document {
    #[must_use]
    pub fn from_chunk(id: String, chunk: Chunk, vector: Vec<f32>, file_category: FileCategory) -> Self {
        let file_extension = std::path::Path::new(&chunk.file_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        Self {
            id,
            content: chunk.content,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            language: chunk.language,
            file_path: chunk.file_path,
            symbol_name: chunk.symbol_name,
            symbol_kind: chunk.symbol_kind,
            symbol_signature: chunk.symbol_signature,
            parent_symbol: chunk.parent_symbol,
            vector,
            file_extension,
            file_category,
        }
    }
}

/// The run state machine of a tree's indexing process (spec.md §3
/// "RunState"): `idle -> indexing -> (indexed | error)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStateKind {
    Idle,
    Indexing,
    Indexed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunState {
    pub kind: RunStateKind,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_indexed_unix_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            kind: RunStateKind::Idle,
            progress: 0,
            progress_message: None,
            total_files: None,
            total_chunks: None,
            last_indexed_unix_ms: None,
            error: None,
        }
    }
}

/// A `Document` projection plus a fused relevance score, as returned by the
/// hybrid searcher (spec.md §3 "SearchResult"). `file_category` may be
/// `None` for legacy rows that predate the category column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_symbol: Option<String>,
    pub file_extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_category: Option<FileCategory>,
    pub score: f32,
}

impl SearchResult {
    #[must_use]
    pub fn from_document(document: Document, score: f32) -> Self {
        Self {
            id: document.id,
            content: document.content,
            start_line: document.start_line,
            end_line: document.end_line,
            language: document.language,
            file_path: document.file_path,
            symbol_name: document.symbol_name,
            symbol_kind: document.symbol_kind,
            symbol_signature: document.symbol_signature,
            parent_symbol: document.parent_symbol,
            file_extension: document.file_extension,
            file_category: Some(document.file_category),
            score,
        }
    }

    /// Category boost multiplier (spec.md §4.3 step 7); absent category
    /// yields `1.0`.
    #[must_use]
    pub fn category_boost(&self) -> f32 {
        self.file_category.map_or(1.0, FileCategory::boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_boost_table_matches_spec() {
        assert_eq!(FileCategory::Source.boost(), 1.0);
        assert_eq!(FileCategory::Test.boost(), 0.75);
        assert_eq!(FileCategory::Config.boost(), 0.70);
        assert_eq!(FileCategory::Doc.boost(), 0.65);
        assert_eq!(FileCategory::Generated.boost(), 0.60);
    }

    #[test]
    fn blank_chunk_is_detected() {
        let chunk = Chunk {
            content: "   \n\t  ".to_string(),
            start_line: 1,
            end_line: 2,
            language: "rust".to_string(),
            file_path: "a.rs".to_string(),
            symbol_name: None,
            symbol_kind: None,
            symbol_signature: None,
            parent_symbol: None,
        };
        assert!(chunk.is_blank());
    }

    #[test]
    fn snapshot_serializes_as_flat_map() {
        let mut snap: Snapshot = HashMap::new();
        snap.insert(
            "src/a.rs".to_string(),
            FileRecord {
                content_hash: "abc123".to_string(),
            },
        );
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"src/a.rs\""));
        assert!(json.contains("\"content_hash\":\"abc123\""));
    }
}
