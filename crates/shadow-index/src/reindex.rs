//! Targeted reindexer (spec.md §6 "Targeted indexer"): re-indexes exactly
//! the files named in a reindex manifest rather than rescanning a tree.

use crate::error::Result;
use eidetic_chunker::Language;
use eidetic_embedding::EmbeddingCache;
use eidetic_indexer::{classify_file_category, collection_name, content_hash, normalize_path, read_snapshot, snapshot_path, write_snapshot_atomic};
use eidetic_protocol::{Document, FileRecord};
use eidetic_vectorstore::VectorStore;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetedReindexResult {
    /// Files that produced at least one chunk and were re-inserted.
    pub updated: Vec<String>,
    /// Files treated as removed: missing from disk, or empty/whitespace-only
    /// content that split into zero chunks (spec.md §6: "treat ENOENT as
    /// 'deletion': vectors remain deleted, file is dropped from snapshot").
    pub deleted: Vec<String>,
}

/// Delete-by-path, read, split, embed, insert — for exactly `relative_paths`
/// (spec.md §6). Updates the existing snapshot in place if one is present;
/// if the tree has never been fully indexed there is no snapshot to update
/// and none is created here (a full `index_codebase` run owns snapshot
/// creation).
pub async fn reindex_files(
    store: &dyn VectorStore,
    embeddings: &EmbeddingCache,
    data_root: &Path,
    project_path: &str,
    relative_paths: &[String],
) -> Result<TargetedReindexResult> {
    let tree = normalize_path(project_path);
    let collection = collection_name(&tree);
    let snap_path = snapshot_path(data_root, &collection);
    let mut snapshot = read_snapshot(&snap_path).await;

    let mut result = TargetedReindexResult::default();

    for relative in relative_paths {
        store.delete_by_path(&collection, relative).await?;

        let full_path = Path::new(&tree).join(relative);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => {
                let hash = content_hash(&bytes);
                let reindexed = reinsert_file(store, embeddings, &collection, relative, &bytes).await?;

                if let Some(snapshot) = snapshot.as_mut() {
                    if reindexed {
                        snapshot.insert(relative.clone(), FileRecord { content_hash: hash });
                    } else {
                        snapshot.remove(relative);
                    }
                }
                if reindexed {
                    result.updated.push(relative.clone());
                } else {
                    result.deleted.push(relative.clone());
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Some(snapshot) = snapshot.as_mut() {
                    snapshot.remove(relative);
                }
                result.deleted.push(relative.clone());
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(snapshot) = snapshot {
        write_snapshot_atomic(&snap_path, &snapshot).await?;
    }

    Ok(result)
}

/// Returns `true` if the file produced chunks and was inserted, `false` if
/// it was empty/whitespace-only, non-UTF-8, or failed both splitters (all
/// of which leave it with no vectors in the store).
async fn reinsert_file(
    store: &dyn VectorStore,
    embeddings: &EmbeddingCache,
    collection: &str,
    relative: &str,
    bytes: &[u8],
) -> Result<bool> {
    let content = match std::str::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => return Ok(false),
    };
    if content.trim().is_empty() {
        return Ok(false);
    }

    let language = Language::from_path(relative);
    let chunks = eidetic_chunker::split(content, language, relative);
    if chunks.is_empty() {
        return Ok(false);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embeddings.embed_batch(&texts).await?;
    let docs: Vec<Document> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| {
            let category = classify_file_category(&chunk.file_path);
            Document::from_chunk(Uuid::new_v4().to_string(), chunk, vector, category)
        })
        .collect();
    store.insert(collection, docs).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidetic_embedding::{EmbeddingProvider, ProviderError};
    use eidetic_protocol::Snapshot;
    use eidetic_vectorstore::InMemoryVectorStore;

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

    async fn make_embeddings(dir: &tempfile::TempDir) -> EmbeddingCache {
        let embeddings = EmbeddingCache::new(Box::new(FixedDimProvider { dim: 4 }), dir.path().join("cache"));
        embeddings.initialize().await.unwrap();
        embeddings
    }

    #[tokio::test]
    async fn reindexes_a_modified_file_and_updates_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("a.rs"), "fn greet() {}\n").unwrap();

        let data_root = dir.path().join("data");
        let store = InMemoryVectorStore::new();
        let embeddings = make_embeddings(&dir).await;
        let tree_str = tree.to_string_lossy().to_string();

        let collection = collection_name(&normalize_path(&tree_str));
        store.create_collection(&collection, 4).await.unwrap();
        let snap_path = snapshot_path(&data_root, &collection);
        write_snapshot_atomic(&snap_path, &Snapshot::new()).await.unwrap();

        let result = reindex_files(&store, &embeddings, &data_root, &tree_str, &["a.rs".to_string()])
            .await
            .unwrap();
        assert_eq!(result.updated, vec!["a.rs".to_string()]);
        assert!(result.deleted.is_empty());

        let snapshot = read_snapshot(&snap_path).await.unwrap();
        assert!(snapshot.contains_key("a.rs"));
    }

    #[tokio::test]
    async fn missing_file_is_treated_as_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(&tree).unwrap();
        let tree_str = tree.to_string_lossy().to_string();

        let data_root = dir.path().join("data");
        let store = InMemoryVectorStore::new();
        let embeddings = make_embeddings(&dir).await;

        let collection = collection_name(&normalize_path(&tree_str));
        store.create_collection(&collection, 4).await.unwrap();
        let snap_path = snapshot_path(&data_root, &collection);
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "gone.rs".to_string(),
            FileRecord {
                content_hash: "deadbeef".to_string(),
            },
        );
        write_snapshot_atomic(&snap_path, &snapshot).await.unwrap();

        let result = reindex_files(&store, &embeddings, &data_root, &tree_str, &["gone.rs".to_string()])
            .await
            .unwrap();
        assert_eq!(result.deleted, vec!["gone.rs".to_string()]);
        assert!(result.updated.is_empty());

        let snapshot = read_snapshot(&snap_path).await.unwrap();
        assert!(!snapshot.contains_key("gone.rs"));
    }

    #[tokio::test]
    async fn no_existing_snapshot_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("a.rs"), "fn greet() {}\n").unwrap();
        let tree_str = tree.to_string_lossy().to_string();

        let data_root = dir.path().join("data");
        let store = InMemoryVectorStore::new();
        let embeddings = make_embeddings(&dir).await;
        let collection = collection_name(&normalize_path(&tree_str));
        store.create_collection(&collection, 4).await.unwrap();

        reindex_files(&store, &embeddings, &data_root, &tree_str, &["a.rs".to_string()])
            .await
            .unwrap();

        let snap_path = snapshot_path(&data_root, &collection);
        assert!(read_snapshot(&snap_path).await.is_none());
    }
}
