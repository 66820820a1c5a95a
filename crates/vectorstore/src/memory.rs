//! In-process [`VectorStore`] used by the other crates' test suites
//! (`search`, `indexer`) so they can exercise the adapter contract without a
//! live backend. Not wired into the MCP server binary.

use crate::error::{Result, VectorStoreError};
use crate::store::{SymbolQuery, SymbolRow, VectorStore};
use async_trait::async_trait;
use eidetic_protocol::{Document, SearchResult};
use std::collections::HashMap;
use std::sync::Mutex;

struct Collection {
    dim: usize,
    docs: Vec<Document>,
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        ((dot / (norm_a * norm_b)) + 1.0) / 2.0
    }
}

fn extension_allowed(doc_ext: &str, filter: Option<&[String]>) -> bool {
    match filter {
        None => true,
        Some(exts) => exts.iter().any(|e| e == doc_ext),
    }
}

fn to_search_result(doc: &Document, score: f32) -> SearchResult {
    SearchResult::from_document(doc.clone(), score)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dim: usize) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(name) {
            return Err(VectorStoreError::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), Collection { dim, docs: Vec::new() });
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> bool {
        self.collections.lock().unwrap().contains_key(name)
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }

    async fn insert(&self, name: &str, docs: Vec<Document>) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::CollectionMissing(name.to_string()))?;
        for doc in &docs {
            if doc.vector.len() != collection.dim {
                return Err(VectorStoreError::PartialInsert(format!(
                    "vector length {} != collection dim {}",
                    doc.vector.len(),
                    collection.dim
                )));
            }
        }
        collection.docs.extend(docs);
        Ok(())
    }

    async fn dense_search(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.lock().unwrap();
        let collection = match collections.get(name) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        let mut scored: Vec<(f32, &Document)> = collection
            .docs
            .iter()
            .filter(|d| extension_allowed(&d.file_extension, extension_filter))
            .map(|d| (cosine_similarity(query_vector, &d.vector), d))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, doc)| to_search_result(doc, score))
            .collect())
    }

    async fn lexical_scroll(
        &self,
        name: &str,
        query_text: &str,
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        let terms: Vec<String> = query_text.split_whitespace().map(str::to_lowercase).collect();
        let collections = self.collections.lock().unwrap();
        let collection = match collections.get(name) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        Ok(collection
            .docs
            .iter()
            .filter(|d| extension_allowed(&d.file_extension, extension_filter))
            .filter(|d| {
                terms.is_empty() || {
                    let lower = d.content.to_lowercase();
                    terms.iter().any(|t| lower.contains(t.as_str()))
                }
            })
            .take(limit)
            .map(|d| to_search_result(d, 0.0))
            .collect())
    }

    async fn delete_by_path(&self, name: &str, rel_path: &str) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(collection) = collections.get_mut(name) {
            collection.docs.retain(|d| d.file_path != rel_path);
        }
        Ok(())
    }

    async fn get_by_id(&self, name: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(name)
            .and_then(|c| c.docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn update_point(&self, name: &str, document: Document) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::CollectionMissing(name.to_string()))?;
        match collection.docs.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => collection.docs.push(document),
        }
        Ok(())
    }

    async fn list_symbols(&self, name: &str, query: SymbolQuery) -> Result<Vec<SymbolRow>> {
        let collections = self.collections.lock().unwrap();
        let collection = match collections.get(name) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        Ok(collection
            .docs
            .iter()
            .filter_map(|d| {
                let name = d.symbol_name.clone()?;
                if name.is_empty() {
                    return None;
                }
                if let Some(path) = &query.path_filter {
                    if !d.file_path.contains(path.as_str()) {
                        return None;
                    }
                }
                if let Some(kind) = &query.kind_filter {
                    if d.symbol_kind.as_deref() != Some(kind.as_str()) {
                        return None;
                    }
                }
                Some(SymbolRow {
                    name,
                    kind: d.symbol_kind.clone().unwrap_or_default(),
                    relative_path: d.file_path.clone(),
                    start_line: d.start_line,
                    signature: d.symbol_signature.clone(),
                    parent_name: d.parent_symbol.clone(),
                })
            })
            .take(crate::store::LIST_SYMBOLS_LIMIT)
            .collect())
    }

    // `search` uses the trait's default dense+lexical+RRF composition
    // (spec.md §4.3 steps 4-6); no override needed here.
}

#[cfg(test)]
mod tests {
    use super::*;
    use eidetic_protocol::FileCategory;

    fn doc(id: &str, path: &str, content: &str, vector: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            content: content.to_string(),
            start_line: 1,
            end_line: 1,
            language: "rust".to_string(),
            file_path: path.to_string(),
            symbol_name: None,
            symbol_kind: None,
            symbol_signature: None,
            parent_symbol: None,
            vector,
            file_extension: ".rs".to_string(),
            file_category: FileCategory::Source,
        }
    }

    #[tokio::test]
    async fn insert_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 3).await.unwrap();
        let err = store
            .insert("c", vec![doc("1", "a.rs", "hi", vec![1.0, 2.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::PartialInsert(_)));
    }

    #[tokio::test]
    async fn delete_by_path_removes_all_matching_docs() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .insert(
                "c",
                vec![
                    doc("1", "a.rs", "one", vec![1.0, 0.0]),
                    doc("2", "a.rs", "two", vec![0.0, 1.0]),
                    doc("3", "b.rs", "three", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store.delete_by_path("c", "a.rs").await.unwrap();
        let remaining = store.get_by_id("c", "3").await.unwrap();
        assert!(remaining.is_some());
        assert!(store.get_by_id("c", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dense_search_ranks_by_cosine_similarity() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .insert(
                "c",
                vec![
                    doc("1", "a.rs", "match", vec![1.0, 0.0]),
                    doc("2", "b.rs", "nomatch", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        let results = store
            .dense_search("c", &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(results[0].id, "1");
    }

    #[tokio::test]
    async fn missing_collection_returns_empty_not_error() {
        let store = InMemoryVectorStore::new();
        let results = store.dense_search("nope", &[1.0], 10, None).await.unwrap();
        assert!(results.is_empty());
    }
}
