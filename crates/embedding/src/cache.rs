use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Default batch size for provider calls (spec.md §4.1 step 7, §4.5 step 3).
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;

/// Default in-memory LRU capacity (spec.md §4.5 step 2).
pub const DEFAULT_LRU_CAPACITY: usize = 10_000;

const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(4),
    Duration::from_secs(16),
];

const PROBE_TEXT: &str = "eidetic-embedding-dimension-probe";

fn is_retryable(status: Option<u16>) -> bool {
    matches!(status, Some(429) | Some(500) | Some(502) | Some(503))
}

fn hash_text(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest)[..16].to_string()
}

/// Minimal hex encoder so this crate doesn't need to pull in the `hex`
/// crate just for a content hash that's already computed via `sha2`.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn sanitize_model_name(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Two-tier, content-addressed embedding cache with provider retry/backoff
/// (spec.md §4.5). `embed`/`embed_batch` are the public contract; every
/// other method is support machinery.
pub struct EmbeddingCache {
    provider: Box<dyn EmbeddingProvider>,
    cache_root: PathBuf,
    lru: Mutex<LruCache<String, Vec<f32>>>,
    dimension: AtomicUsize,
    ready: AtomicBool,
    batch_size: usize,
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(provider: Box<dyn EmbeddingProvider>, cache_root: PathBuf) -> Self {
        Self::with_capacity(provider, cache_root, DEFAULT_LRU_CAPACITY, DEFAULT_EMBEDDING_BATCH_SIZE)
    }

    #[must_use]
    pub fn with_capacity(
        provider: Box<dyn EmbeddingProvider>,
        cache_root: PathBuf,
        lru_capacity: usize,
        batch_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(lru_capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            provider,
            cache_root,
            lru: Mutex::new(LruCache::new(capacity)),
            dimension: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            batch_size,
        }
    }

    /// Embeds a probe string, records its length as the provider's
    /// dimension, and transitions the cache to "ready" (spec.md §4.5
    /// "Initialization"). Any `embed`/`embed_batch` call before this
    /// completes fails with [`EmbeddingError::NotReady`].
    pub async fn initialize(&self) -> Result<usize> {
        let vectors = embed_with_retry(self.provider.as_ref(), &[PROBE_TEXT.to_string()]).await?;
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        self.dimension.store(dim, Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
        Ok(dim)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        Ok(vectors.remove(0))
    }

    /// `embedBatch(texts) -> vectors[]`, preserving order and length
    /// (spec.md §4.5 contract).
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.is_ready() {
            return Err(EmbeddingError::NotReady);
        }
        let dim = self.dimension();
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached_indices = Vec::new();
        let mut uncached_texts = Vec::new();
        let mut uncached_hashes = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                out[i] = Some(vec![0.0; dim]);
                continue;
            }
            let hash = hash_text(text);
            if let Some(vector) = self.lru_get(&hash) {
                out[i] = Some(vector);
                continue;
            }
            match self.disk_get(&hash).await {
                Some(vector) => {
                    self.lru_put(hash, vector.clone());
                    out[i] = Some(vector);
                }
                None => {
                    uncached_indices.push(i);
                    uncached_texts.push(text.clone());
                    uncached_hashes.push(hash);
                }
            }
        }

        if !uncached_texts.is_empty() {
            for chunk_range in (0..uncached_texts.len()).step_by(self.batch_size.max(1)) {
                let end = (chunk_range + self.batch_size.max(1)).min(uncached_texts.len());
                let chunk_texts = &uncached_texts[chunk_range..end];
                let vectors = embed_with_retry(self.provider.as_ref(), chunk_texts).await?;
                for (offset, vector) in vectors.into_iter().enumerate() {
                    let global = chunk_range + offset;
                    let hash = uncached_hashes[global].clone();
                    self.lru_put(hash.clone(), vector.clone());
                    self.spawn_disk_write(hash, vector.clone());
                    out[uncached_indices[global]] = Some(vector);
                }
            }
        }

        Ok(out.into_iter().map(|v| v.unwrap_or_default()).collect())
    }

    fn lru_get(&self, hash: &str) -> Option<Vec<f32>> {
        self.lru.lock().unwrap().get(hash).cloned()
    }

    fn lru_put(&self, hash: String, vector: Vec<f32>) {
        self.lru.lock().unwrap().put(hash, vector);
    }

    fn disk_path(&self, model: &str, hash: &str) -> PathBuf {
        self.cache_root
            .join(sanitize_model_name(model))
            .join(&hash[..2])
            .join(format!("{hash}.json"))
    }

    async fn disk_get(&self, hash: &str) -> Option<Vec<f32>> {
        let path = self.disk_path(self.provider.model_name(), hash);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<Vec<f32>>(&bytes) {
            Ok(vector) => Some(vector),
            Err(_) => {
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
        }
    }

    fn spawn_disk_write(&self, hash: String, vector: Vec<f32>) {
        let path = self.disk_path(self.provider.model_name(), &hash);
        tokio::spawn(async move {
            if let Err(err) = write_disk_entry(&path, &vector).await {
                log::warn!("embedding disk cache write failed for {path:?}: {err}");
            }
        });
    }
}

async fn write_disk_entry(path: &Path, vector: &[f32]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec(vector).unwrap_or_default();
    tokio::fs::write(path, json).await
}

/// Retry loop with per-batch halving on 429 (spec.md §4.5 step 4).
/// Iterative rather than recursive: a stack of `(start, end, attempt)`
/// ranges over `texts`, so a 429 on a big batch splits it into two halves
/// that retry independently instead of blowing the whole call away.
async fn embed_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
    let mut work: Vec<(usize, usize, usize)> = vec![(0, texts.len(), 0)];

    while let Some((start, end, attempt)) = work.pop() {
        let slice = &texts[start..end];
        match provider.embed_batch(slice).await {
            Ok(vectors) => {
                if vectors.len() != slice.len() {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: slice.len(),
                        got: vectors.len(),
                    });
                }
                for (offset, vector) in vectors.into_iter().enumerate() {
                    out[start + offset] = Some(vector);
                }
            }
            Err(e) if attempt < RETRY_DELAYS.len() && is_retryable(e.status) => {
                let mut delay = RETRY_DELAYS[attempt];
                if e.status == Some(429) {
                    if let Some(retry_after) = e.retry_after {
                        delay = retry_after.min(Duration::from_secs(60));
                    }
                    let mid = start + ((end - start) / 2).max(1);
                    if mid < end {
                        tokio::time::sleep(delay).await;
                        work.push((mid, end, attempt + 1));
                        work.push((start, mid, attempt + 1));
                        continue;
                    }
                }
                tokio::time::sleep(delay).await;
                work.push((start, end, attempt + 1));
            }
            Err(e) => {
                return Err(EmbeddingError::Provider {
                    status: e.status,
                    message: e.message,
                })
            }
        }
    }

    Ok(out
        .into_iter()
        .map(|v| v.unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<StdAtomicUsize>,
        dim: usize,
        fail_times: Arc<StdAtomicUsize>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(ProviderError {
                    status: Some(503),
                    message: "temporarily unavailable".to_string(),
                    retry_after: None,
                });
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32; self.dim]).collect())
        }

        fn model_name(&self) -> &str {
            "counting-model"
        }
    }

    fn cache_with(provider: CountingProvider, dir: &tempfile::TempDir) -> EmbeddingCache {
        EmbeddingCache::new(Box::new(provider), dir.path().to_path_buf())
    }

    #[tokio::test]
    async fn embed_twice_hits_cache_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(StdAtomicUsize::new(0));
        let cache = cache_with(
            CountingProvider {
                calls: calls.clone(),
                dim: 4,
                fail_times: Arc::new(StdAtomicUsize::new(0)),
            },
            &dir,
        );
        cache.initialize().await.unwrap();
        let after_init = calls.load(Ordering::SeqCst);

        cache.embed("hello world").await.unwrap();
        cache.embed("hello world").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), after_init + 1);
    }

    #[tokio::test]
    async fn whitespace_only_text_short_circuits_without_provider_call() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(StdAtomicUsize::new(0));
        let cache = cache_with(
            CountingProvider {
                calls: calls.clone(),
                dim: 3,
                fail_times: Arc::new(StdAtomicUsize::new(0)),
            },
            &dir,
        );
        cache.initialize().await.unwrap();
        let after_init = calls.load(Ordering::SeqCst);

        let vectors = cache.embed_batch(&["   ".to_string(), "\t\n".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.0; 3], vec![0.0; 3]]);
        assert_eq!(calls.load(Ordering::SeqCst), after_init);
    }

    #[tokio::test]
    async fn embed_before_initialize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with(
            CountingProvider {
                calls: Arc::new(StdAtomicUsize::new(0)),
                dim: 2,
                fail_times: Arc::new(StdAtomicUsize::new(0)),
            },
            &dir,
        );
        assert!(matches!(cache.embed("x").await, Err(EmbeddingError::NotReady)));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_provider_error_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(StdAtomicUsize::new(0));
        let provider = CountingProvider {
            calls: calls.clone(),
            dim: 2,
            fail_times: Arc::new(StdAtomicUsize::new(1)),
        };
        let vectors = embed_with_retry(&provider, &["a".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
