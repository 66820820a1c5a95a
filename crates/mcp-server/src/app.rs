use eidetic_embedding::{EmbeddingCache, HttpEmbeddingProvider};
use eidetic_indexer::{registry_path, ProjectRegistry, StateMap, TreeMutexMap};
use eidetic_indexer::{collection_name, normalize_path, Indexer};
use eidetic_search::HybridSearcher;
use eidetic_vectorstore::{HttpVectorStore, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;

/// Every collaborator a tool handler needs, constructed once at startup and
/// shared (behind `Arc`) across concurrent RPC requests (spec.md §5: "the
/// RPC handler accepts concurrent requests; each request that mutates a
/// tree passes through the per-tree mutex").
pub struct AppState {
    pub data_root: PathBuf,
    pub store: Arc<dyn VectorStore>,
    pub embeddings: Arc<EmbeddingCache>,
    pub indexer: Arc<Indexer>,
    pub searcher: Arc<HybridSearcher>,
    pub registry: Arc<ProjectRegistry>,
    pub states: Arc<StateMap>,
}

impl AppState {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_root)?;

        let provider = HttpEmbeddingProvider::new(config.embedding);
        let embeddings = Arc::new(EmbeddingCache::new(Box::new(provider), config.data_root.join("cache/embeddings")));
        embeddings.initialize().await?;

        let store: Arc<dyn VectorStore> = Arc::new(HttpVectorStore::new(config.vector_store));
        let mutexes = Arc::new(TreeMutexMap::new());
        let states = Arc::new(StateMap::new());
        let registry = Arc::new(ProjectRegistry::load(registry_path(&config.data_root)));

        let mut indexer = Indexer::new(store.clone(), embeddings.clone(), config.data_root.clone(), mutexes, states.clone());
        if let Some(concurrency) = config.indexing_concurrency {
            indexer = indexer.with_concurrency(concurrency);
        }
        if let Some(batch_size) = config.embedding_batch_size {
            indexer = indexer.with_embedding_batch_size(batch_size);
        }
        let indexer = Arc::new(indexer);

        let searcher = Arc::new(HybridSearcher::new(store.clone(), embeddings.clone()));

        let state = Self {
            data_root: config.data_root,
            store,
            embeddings,
            indexer,
            searcher,
            registry,
            states,
        };
        state.hydrate_states().await;
        Ok(state)
    }

    /// Reconstructs a best-effort `RunState` view at startup (spec.md §4.7
    /// "Hydration scans the registry ... marks state indexed (unknown
    /// timestamp)").
    async fn hydrate_states(&self) {
        let projects = self.registry.list_projects();
        self.states.hydrate(&projects, |path| collection_name(&normalize_path(path)), self.store.as_ref()).await;
    }
}
