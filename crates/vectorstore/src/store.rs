use crate::error::Result;
use crate::fusion::{normalized_term_frequency, reciprocal_rank_fusion, RankedHit};
use async_trait::async_trait;
use eidetic_protocol::{Document, SearchResult};

/// Parameters for a hybrid search against one collection (spec.md §4.4
/// "search"). `limit` here is the *fetch* size the caller has already
/// widened past its own final result count (spec.md §4.3 step 2) — it
/// bounds how many candidates `dense_search`/`lexical_scroll` each
/// retrieve. `effective_limit` is the caller's own `limit'` (spec.md §4.3
/// step 6: "sort descending; take top limit'"); the adapter truncates the
/// fused list to it *before* returning, so category boost and overlap
/// dedup — the hybrid searcher's job (`eidetic-search`), not the
/// adapter's — operate on the already-truncated top-`limit'` set rather
/// than the wider fetch set.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query_vector: Vec<f32>,
    pub query_text: String,
    pub limit: usize,
    pub effective_limit: usize,
    pub extension_filter: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolQuery {
    pub path_filter: Option<String>,
    pub kind_filter: Option<String>,
}

/// One row of `listSymbols` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct SymbolRow {
    pub name: String,
    pub kind: String,
    pub relative_path: String,
    pub start_line: usize,
    pub signature: Option<String>,
    pub parent_name: Option<String>,
}

/// Upper bound on `listSymbols` rows (spec.md §4.4: "implementation-defined,
/// >= 10k").
pub const LIST_SYMBOLS_LIMIT: usize = 10_000;

/// The narrow interface shared by all vector-store backends (spec.md §4.4).
///
/// Every method either succeeds or fails with a [`crate::VectorStoreError`]
/// carrying the underlying cause; the adapter never retries internally —
/// that decision belongs to the caller (the indexer, for writes; the
/// searcher, for reads).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent-failure create: succeeds once, fails if the collection
    /// already exists. Sets up secondary indexes on `relativePath`,
    /// `fileExtension`, `fileCategory`, and tokenized full-text on
    /// `content`.
    async fn create_collection(&self, name: &str, dim: usize) -> Result<()>;

    /// Network/transport error is folded into `false` so callers can
    /// re-probe rather than fail (spec.md §4.4).
    async fn has_collection(&self, name: &str) -> bool;

    /// No-op if the collection does not exist.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Batched internally to <= 100 per wire call; waits for durability
    /// before returning. A partial batch failure fails the whole call.
    async fn insert(&self, name: &str, docs: Vec<Document>) -> Result<()>;

    /// Dense vector similarity search, top `limit`, optional OR-filter on
    /// `fileExtension`. Scores are assumed to already lie in `[0, 1]`
    /// (cosine similarity against normalized embeddings).
    async fn dense_search(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>>;

    /// Scroll the collection with a "content contains query" filter, up to
    /// `limit` points, same extension filter. Ranking by normalized term
    /// frequency (spec.md §4.3) is done client-side over the returned
    /// points by [`VectorStore::search`]'s default implementation.
    async fn lexical_scroll(
        &self,
        name: &str,
        query_text: &str,
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>>;

    /// Deletes all points whose `relativePath == rel_path`; waits for
    /// durability.
    async fn delete_by_path(&self, name: &str, rel_path: &str) -> Result<()>;

    async fn get_by_id(&self, name: &str, id: &str) -> Result<Option<Document>>;

    /// Unconditional upsert by id.
    async fn update_point(&self, name: &str, document: Document) -> Result<()>;

    async fn list_symbols(&self, name: &str, query: SymbolQuery) -> Result<Vec<SymbolRow>>;

    /// Dense search + lexical scroll + blended RRF (spec.md §4.3 steps 4–6).
    /// The default implementation is backend-agnostic: it only needs
    /// `dense_search` and `lexical_scroll` to be implemented.
    async fn search(&self, name: &str, query: SearchQuery) -> Result<Vec<SearchResult>> {
        let extension_filter = query.extension_filter.as_deref();
        let dense = self
            .dense_search(name, &query.query_vector, query.limit, extension_filter)
            .await?;
        let lexical = self
            .lexical_scroll(name, &query.query_text, query.limit, extension_filter)
            .await?;

        if dense.is_empty() && lexical.is_empty() {
            return Ok(Vec::new());
        }

        let dense_hits: Vec<RankedHit> = dense
            .iter()
            .map(|r| RankedHit {
                id: r.id.clone(),
                score: r.score.clamp(0.0, 1.0),
            })
            .collect();

        let lexical_points: Vec<(String, String)> = lexical
            .iter()
            .map(|r| (r.id.clone(), r.content.clone()))
            .collect();
        let lexical_hits = normalized_term_frequency(&query.query_text, &lexical_points);

        let fused = reciprocal_rank_fusion(&dense_hits, &lexical_hits);

        let mut by_id: std::collections::HashMap<String, SearchResult> = std::collections::HashMap::new();
        for r in dense.into_iter().chain(lexical.into_iter()) {
            by_id.entry(r.id.clone()).or_insert(r);
        }

        Ok(fused
            .into_iter()
            .filter_map(|(id, score)| {
                by_id.remove(&id).map(|mut result| {
                    result.score = score;
                    result
                })
            })
            .take(query.effective_limit)
            .collect())
    }
}
