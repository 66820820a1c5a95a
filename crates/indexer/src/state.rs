use eidetic_protocol::{RunState, RunStateKind};
use eidetic_vectorstore::VectorStore;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local, ephemeral run-state map keyed by normalized tree path
/// (spec.md §3 "RunState", §4.7). Lost on restart; [`StateMap::hydrate`]
/// reconstructs a best-effort view from the registry and the store.
#[derive(Default)]
pub struct StateMap {
    inner: Mutex<HashMap<String, RunState>>,
}

impl StateMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, tree: &str) -> Option<RunState> {
        self.inner.lock().unwrap().get(tree).cloned()
    }

    pub fn set_indexing(&self, tree: &str) {
        self.inner.lock().unwrap().insert(
            tree.to_string(),
            RunState {
                kind: RunStateKind::Indexing,
                progress: 0,
                progress_message: None,
                total_files: None,
                total_chunks: None,
                last_indexed_unix_ms: None,
                error: None,
            },
        );
    }

    pub fn update_progress(&self, tree: &str, progress: u8, message: impl Into<String>) {
        let mut map = self.inner.lock().unwrap();
        let entry = map.entry(tree.to_string()).or_insert_with(RunState::idle);
        entry.kind = RunStateKind::Indexing;
        entry.progress = entry.progress.max(progress);
        entry.progress_message = Some(message.into());
    }

    pub fn set_indexed(&self, tree: &str, total_files: u64, total_chunks: u64, last_indexed_unix_ms: u64) {
        self.inner.lock().unwrap().insert(
            tree.to_string(),
            RunState {
                kind: RunStateKind::Indexed,
                progress: 100,
                progress_message: None,
                total_files: Some(total_files),
                total_chunks: Some(total_chunks),
                last_indexed_unix_ms: Some(last_indexed_unix_ms),
                error: None,
            },
        );
    }

    pub fn set_error(&self, tree: &str, message: impl Into<String>) {
        let mut map = self.inner.lock().unwrap();
        let mut entry = map.remove(tree).unwrap_or_else(RunState::idle);
        entry.kind = RunStateKind::Error;
        entry.error = Some(message.into());
        map.insert(tree.to_string(), entry);
    }

    pub fn remove(&self, tree: &str) {
        self.inner.lock().unwrap().remove(tree);
    }

    /// Scans the registry at startup; for each entry whose collection
    /// exists in the store, marks state "indexed (unknown timestamp)"
    /// unless already present (spec.md §3 "RunState" lifecycle).
    pub async fn hydrate(
        &self,
        projects: &[(String, String)],
        collection_name_of: impl Fn(&str) -> String,
        store: &dyn VectorStore,
    ) {
        for (_, path) in projects {
            if self.get(path).is_some() {
                continue;
            }
            let collection = collection_name_of(path);
            if store.has_collection(&collection).await {
                self.inner.lock().unwrap().insert(
                    path.clone(),
                    RunState {
                        kind: RunStateKind::Indexed,
                        progress: 100,
                        progress_message: Some("indexed, unknown timestamp".to_string()),
                        total_files: None,
                        total_chunks: None,
                        last_indexed_unix_ms: None,
                        error: None,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hydrate_marks_existing_collections_indexed() {
        let store = eidetic_vectorstore::InMemoryVectorStore::new();
        store.create_collection("eidetic_proj", 3).await.unwrap();
        let states = StateMap::new();
        states
            .hydrate(
                &[("proj".to_string(), "/home/user/proj".to_string())],
                |_| "eidetic_proj".to_string(),
                &store,
            )
            .await;
        let state = states.get("/home/user/proj").unwrap();
        assert_eq!(state.kind, RunStateKind::Indexed);
        assert!(state.last_indexed_unix_ms.is_none());
    }

    #[test]
    fn progress_is_monotonic_non_decreasing() {
        let states = StateMap::new();
        states.update_progress("/t", 10, "a");
        states.update_progress("/t", 5, "b");
        assert_eq!(states.get("/t").unwrap().progress, 10);
    }
}
