use crate::category::classify_file_category;
use crate::error::{IndexerError, Result};
use crate::mutex::TreeMutexMap;
use crate::paths::{collection_name, normalize_path};
use crate::scanner::scan_files;
use crate::snapshot::{build_snapshot, diff_snapshots, read_snapshot, snapshot_path, write_snapshot_atomic};
use crate::state::StateMap;
use eidetic_chunker::Language;
use eidetic_embedding::EmbeddingCache;
use eidetic_protocol::{Document, Snapshot};
use eidetic_vectorstore::VectorStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Bounded worker-pool size for per-file splits and per-batch embeds
/// (spec.md §5 "Scheduling model").
pub const DEFAULT_INDEXING_CONCURRENCY: usize = 8;

/// `embedBatch` size during the upsert pipeline (spec.md §4.1 step 7).
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = eidetic_embedding::DEFAULT_EMBEDDING_BATCH_SIZE;

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub force: bool,
    pub custom_extensions: Vec<String>,
    pub custom_ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub total_files: u64,
    pub total_chunks: u64,
    pub added: u64,
    pub modified: u64,
    pub removed: u64,
    pub skipped: u64,
    pub parse_failures: Vec<String>,
    pub est_tokens: u64,
    pub est_cost_usd: f64,
    pub duration_ms: u64,
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingCache>,
    data_root: PathBuf,
    mutexes: Arc<TreeMutexMap>,
    states: Arc<StateMap>,
    concurrency: usize,
    embedding_batch_size: usize,
}

impl Indexer {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: Arc<EmbeddingCache>,
        data_root: PathBuf,
        mutexes: Arc<TreeMutexMap>,
        states: Arc<StateMap>,
    ) -> Self {
        Self {
            store,
            embeddings,
            data_root,
            mutexes,
            states,
            concurrency: DEFAULT_INDEXING_CONCURRENCY,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }

    /// Overrides the bounded worker-pool size for per-file splits
    /// (spec.md §5 "Scheduling model": `indexingConcurrency`, default 8).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Overrides the `embedBatch` batch size (spec.md §4.1 step 7).
    #[must_use]
    pub fn with_embedding_batch_size(mut self, batch_size: usize) -> Self {
        self.embedding_batch_size = batch_size;
        self
    }

    /// Runs `index` for one tree, serialized FIFO against any other
    /// `index`/`clear` on the same tree (spec.md §3 invariant 3, §4.7).
    pub async fn index(
        &self,
        tree: &str,
        options: IndexOptions,
        mut on_progress: impl FnMut(u8, &str),
    ) -> Result<IndexResult> {
        let normalized = normalize_path(tree);
        let _guard = self.mutexes.acquire(&normalized).await;
        self.states.set_indexing(&normalized);

        let states = &self.states;
        let mut tracked_progress = |pct: u8, msg: &str| {
            states.update_progress(&normalized, pct, msg);
            on_progress(pct, msg);
        };

        match self.index_locked(&normalized, options, &mut tracked_progress).await {
            Ok(result) => {
                self.states.set_indexed(
                    &normalized,
                    result.total_files,
                    result.total_chunks,
                    now_unix_ms(),
                );
                Ok(result)
            }
            Err(err) => {
                self.states.set_error(&normalized, err.to_string());
                Err(err)
            }
        }
    }

    pub async fn clear_index(&self, tree: &str) -> Result<()> {
        let normalized = normalize_path(tree);
        let _guard = self.mutexes.acquire(&normalized).await;
        let collection = collection_name(&normalized);
        self.store.drop_collection(&collection).await?;
        let snap_path = snapshot_path(&self.data_root, &collection);
        let _ = tokio::fs::remove_file(&snap_path).await;
        self.states.remove(&normalized);
        Ok(())
    }

    async fn index_locked(
        &self,
        tree: &str,
        options: IndexOptions,
        on_progress: &mut impl FnMut(u8, &str),
    ) -> Result<IndexResult> {
        let start = Instant::now();
        on_progress(0, "scanning tree");
        let tree_path = Path::new(tree);
        let files = scan_files(tree_path, &options.custom_extensions, &options.custom_ignore_patterns);
        if files.is_empty() {
            return Err(IndexerError::EmptyTree);
        }

        let collection = collection_name(tree);
        let current_snapshot = build_snapshot(tree_path, &files);
        let snap_path = snapshot_path(&self.data_root, &collection);

        let (work, added, modified, removed, prev_snapshot) = if options.force {
            on_progress(5, "dropping existing collection");
            self.store.drop_collection(&collection).await?;
            self.store.create_collection(&collection, self.embeddings.dimension()).await?;
            (files.clone(), files.len() as u64, 0, 0, None)
        } else {
            let previous = read_snapshot(&snap_path).await;
            match previous {
                None => {
                    if !self.store.has_collection(&collection).await {
                        self.store
                            .create_collection(&collection, self.embeddings.dimension())
                            .await?;
                    }
                    (files.clone(), files.len() as u64, 0, 0, None)
                }
                Some(prev_snapshot) => {
                    let diff = diff_snapshots(&prev_snapshot, &current_snapshot);
                    for path in diff.removed.iter().chain(diff.modified.iter()) {
                        self.store.delete_by_path(&collection, path).await?;
                    }
                    let mut work = diff.added.clone();
                    work.extend(diff.modified.iter().cloned());
                    (
                        work,
                        diff.added.len() as u64,
                        diff.modified.len() as u64,
                        diff.removed.len() as u64,
                        Some(prev_snapshot),
                    )
                }
            }
        };

        if work.is_empty() {
            on_progress(98, "persisting snapshot");
            let persisted = carry_forward_snapshot(current_snapshot, &work, &HashSet::new(), prev_snapshot.as_ref());
            write_snapshot_atomic(&snap_path, &persisted).await?;
            on_progress(100, "done");
            return Ok(IndexResult {
                total_files: files.len() as u64,
                total_chunks: 0,
                added,
                modified,
                removed,
                skipped: files.len() as u64,
                parse_failures: Vec::new(),
                est_tokens: 0,
                est_cost_usd: 0.0,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        on_progress(10, "splitting files");
        let (chunks, parse_failures, dropped) = self.split_all(tree_path, &work).await;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let cost = eidetic_embedding::estimate_tokens(&texts, self.embeddings.model_name());

        let total_chunk_count = chunks.len() as u64;
        self.embed_and_insert(&collection, chunks, on_progress).await?;

        on_progress(98, "persisting snapshot");
        let persisted = carry_forward_snapshot(current_snapshot, &work, &dropped, prev_snapshot.as_ref());
        write_snapshot_atomic(&snap_path, &persisted).await?;
        on_progress(100, "done");

        Ok(IndexResult {
            total_files: files.len() as u64,
            total_chunks: total_chunk_count,
            added,
            modified,
            removed,
            skipped: files.len() as u64 - work.len() as u64,
            parse_failures,
            est_tokens: cost.est_tokens,
            est_cost_usd: cost.est_cost_usd,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Splits `work` files in parallel with bounded concurrency (spec.md
    /// §4.1 step 6). Empty/whitespace-only files are silently skipped;
    /// files where both the AST and line splitter produce zero chunks are
    /// recorded as parse failures but do not abort the run. Either way the
    /// file produced zero chunks and zero vectors, so its relative path is
    /// also returned for exclusion from the persisted snapshot (spec.md §3
    /// invariant 2).
    async fn split_all(
        &self,
        tree_root: &Path,
        relative_paths: &[String],
    ) -> (Vec<eidetic_protocol::Chunk>, Vec<String>, HashSet<String>) {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.concurrency.max(1)));
        let mut tasks = tokio::task::JoinSet::new();
        for relative in relative_paths {
            let full_path = tree_root.join(relative);
            let relative = relative.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                let outcome = split_one_file(&full_path, &relative).await;
                (relative, outcome)
            });
        }

        let mut chunks = Vec::new();
        let mut parse_failures = Vec::new();
        let mut dropped = HashSet::new();
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok((_, FileSplitOutcome::Chunks(mut file_chunks))) => chunks.append(&mut file_chunks),
                Ok((relative, FileSplitOutcome::Empty)) => {
                    dropped.insert(relative);
                }
                Ok((relative, FileSplitOutcome::ParseFailure(path))) => {
                    parse_failures.push(path);
                    dropped.insert(relative);
                }
                Err(err) => log::warn!("split task panicked: {err}"),
            }
        }
        (chunks, parse_failures, dropped)
    }

    /// Embeds and inserts `chunks` in batches (spec.md §4.1 step 7). Batch
    /// inserts are awaited one at a time so memory stays bounded and
    /// progress stays monotonic (spec.md §5 "Within an index run").
    async fn embed_and_insert(
        &self,
        collection: &str,
        chunks: Vec<eidetic_protocol::Chunk>,
        on_progress: &mut impl FnMut(u8, &str),
    ) -> Result<()> {
        let total_batches = chunks.len().div_ceil(self.embedding_batch_size.max(1)).max(1);
        for (batch_index, batch) in chunks.chunks(self.embedding_batch_size.max(1)).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embeddings.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexerError::Embedding(
                    eidetic_embedding::EmbeddingError::DimensionMismatch {
                        expected: batch.len(),
                        got: vectors.len(),
                    },
                ));
            }

            let docs: Vec<Document> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| {
                    let category = classify_file_category(&chunk.file_path);
                    Document::from_chunk(Uuid::new_v4().to_string(), chunk, vector, category)
                })
                .collect();

            self.store.insert(collection, docs).await?;

            let pct = 10 + ((batch_index + 1) * 85 / total_batches).min(85);
            on_progress(pct.min(98) as u8, "embedding and inserting");
        }
        Ok(())
    }
}

enum FileSplitOutcome {
    Chunks(Vec<eidetic_protocol::Chunk>),
    Empty,
    ParseFailure(String),
}

async fn split_one_file(full_path: &Path, relative: &str) -> FileSplitOutcome {
    let bytes = match tokio::fs::read(full_path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("failed to read {relative} during split: {err}");
            return FileSplitOutcome::ParseFailure(relative.to_string());
        }
    };
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            log::warn!("skipping non-UTF-8 file {relative}");
            return FileSplitOutcome::ParseFailure(relative.to_string());
        }
    };
    if content.trim().is_empty() {
        return FileSplitOutcome::Empty;
    }
    let language = Language::from_path(relative);
    let chunks = eidetic_chunker::split(&content, language, relative);
    if chunks.is_empty() {
        FileSplitOutcome::ParseFailure(relative.to_string())
    } else {
        FileSplitOutcome::Chunks(chunks)
    }
}

/// Filters `current_snapshot` down to the set of files that actually
/// survived scan+split (spec.md §3 invariant 2): drop any path in `work`
/// that produced zero chunks this run, and for paths untouched this run
/// (not in `work`) carry them forward only if they were already present in
/// the previous persisted snapshot — a file already excluded as zero-chunk
/// on a prior run stays excluded until it changes.
fn carry_forward_snapshot(
    mut current_snapshot: Snapshot,
    work: &[String],
    dropped: &HashSet<String>,
    prev_snapshot: Option<&Snapshot>,
) -> Snapshot {
    for path in dropped {
        current_snapshot.remove(path);
    }
    if let Some(prev) = prev_snapshot {
        let work_set: HashSet<&String> = work.iter().collect();
        current_snapshot.retain(|path, _| work_set.contains(path) || prev.contains_key(path));
    }
    current_snapshot
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidetic_embedding::{EmbeddingCache, EmbeddingProvider, ProviderError};
    use eidetic_vectorstore::InMemoryVectorStore;
    use std::sync::Arc;

    struct FixedDimProvider {
        dim: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedDimProvider {
        async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|_| vec![0.1; self.dim]).collect())
        }
        fn model_name(&self) -> &str {
            "test-model"
        }
    }

    async fn make_indexer(dir: &tempfile::TempDir) -> Indexer {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let embeddings = Arc::new(EmbeddingCache::new(Box::new(FixedDimProvider { dim: 4 }), dir.path().join("cache")));
        embeddings.initialize().await.unwrap();
        Indexer::new(
            store,
            embeddings,
            dir.path().join("data"),
            Arc::new(TreeMutexMap::new()),
            Arc::new(StateMap::new()),
        )
    }

    #[tokio::test]
    async fn reindex_with_no_changes_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("src")).unwrap();
        std::fs::write(tree.join("src/main.rs"), "fn greet() {\n    1\n}\n").unwrap();

        let indexer = make_indexer(&dir).await;
        let tree_str = tree.to_string_lossy().to_string();

        let first = indexer.index(&tree_str, IndexOptions::default(), |_, _| {}).await.unwrap();
        assert_eq!(first.added, 1);
        assert_eq!(first.skipped, 0);

        let second = indexer.index(&tree_str, IndexOptions::default(), |_, _| {}).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.modified, 0);
        assert_eq!(second.skipped, second.total_files);
    }

    #[tokio::test]
    async fn empty_tree_fails_with_empty_tree_error() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("empty");
        std::fs::create_dir_all(&tree).unwrap();
        let indexer = make_indexer(&dir).await;
        let err = indexer
            .index(&tree.to_string_lossy(), IndexOptions::default(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::EmptyTree));
    }
}
