//! HTTP-backed [`VectorStore`] implementation.
//!
//! The remote vector-store service is an external collaborator (spec.md
//! §1): this adapter only needs to speak whatever wire format it exposes.
//! Two backends are in scope (spec.md §4.4): a primary backend offering
//! true dense + full-text hybrid indexes, and a fallback dense-only mode
//! used when the remote reports it cannot build a sparse/text index on
//! collection creation. Detection is by a specific "data type unsupported"
//! substring in the creation error; once detected for a collection name,
//! the mode is remembered so later calls skip the doomed attempt.

use crate::error::{Result, VectorStoreError};
use crate::store::{SymbolQuery, SymbolRow, VectorStore};
use async_trait::async_trait;
use eidetic_protocol::{Document, FileCategory, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Per-call deadline for embedding/vector-store calls (spec.md §5
/// "Cancellation / timeouts"): implementation-defined, chosen as 10s.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Batched to <= 100 per wire call (spec.md §4.4 "insert").
const INSERT_BATCH_SIZE: usize = 100;

const UNSUPPORTED_DATA_TYPE_MARKER: &str = "data type unsupported";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionMode {
    Hybrid,
    DenseOnly,
}

#[derive(Debug, Clone)]
pub struct HttpVectorStoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpVectorStoreConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    /// Remembers which collections fell back to dense-only so subsequent
    /// `create_collection`/`insert` calls don't re-attempt the hybrid path.
    modes: RwLock<HashMap<String, CollectionMode>>,
}

impl HttpVectorStore {
    #[must_use]
    pub fn new(config: HttpVectorStoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            modes: RwLock::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn mode_of(&self, name: &str) -> Option<CollectionMode> {
        self.modes.read().ok().and_then(|m| m.get(name).copied())
    }

    fn remember_mode(&self, name: &str, mode: CollectionMode) {
        if let Ok(mut m) = self.modes.write() {
            m.insert(name.to_string(), mode);
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn create_collection_with_mode(
        &self,
        name: &str,
        dim: usize,
        mode: CollectionMode,
    ) -> Result<()> {
        let body = CreateCollectionBody {
            name: name.to_string(),
            dim,
            hybrid: mode == CollectionMode::Hybrid,
        };
        let resp = self
            .request(reqwest::Method::PUT, &format!("/collections/{name}"))
            .json(&body)
            .send()
            .await
            .map_err(VectorStoreError::transport)?;

        if resp.status().is_success() {
            self.remember_mode(name, mode);
            return Ok(());
        }
        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(VectorStoreError::CollectionExists(name.to_string()));
        }

        let text = resp.text().await.unwrap_or_default();
        if mode == CollectionMode::Hybrid && text.contains(UNSUPPORTED_DATA_TYPE_MARKER) {
            // Drop whatever half-created collection resulted and retry
            // dense-only (spec.md §4.4 "Backends in scope").
            let _ = self.drop_collection(name).await;
            return Box::pin(self.create_collection_with_mode(name, dim, CollectionMode::DenseOnly))
                .await;
        }
        Err(VectorStoreError::Protocol(text))
    }
}

#[derive(Serialize)]
struct CreateCollectionBody {
    name: String,
    dim: usize,
    hybrid: bool,
}

#[derive(Serialize)]
struct DenseSearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension_filter: Option<&'a [String]>,
}

#[derive(Serialize)]
struct ScrollBody<'a> {
    content_contains: &'a str,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension_filter: Option<&'a [String]>,
}

#[derive(Serialize)]
struct DeleteByPathBody<'a> {
    relative_path: &'a str,
}

#[derive(Serialize)]
struct ListSymbolsBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    path_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind_filter: Option<String>,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResultWire {
    id: String,
    content: String,
    start_line: usize,
    end_line: usize,
    language: String,
    file_path: String,
    symbol_name: Option<String>,
    symbol_kind: Option<String>,
    symbol_signature: Option<String>,
    parent_symbol: Option<String>,
    file_extension: String,
    file_category: Option<FileCategory>,
    score: f32,
}

impl From<SearchResultWire> for SearchResult {
    fn from(w: SearchResultWire) -> Self {
        SearchResult {
            id: w.id,
            content: w.content,
            start_line: w.start_line,
            end_line: w.end_line,
            language: w.language,
            file_path: w.file_path,
            symbol_name: w.symbol_name,
            symbol_kind: w.symbol_kind,
            symbol_signature: w.symbol_signature,
            parent_symbol: w.parent_symbol,
            file_extension: w.file_extension,
            file_category: w.file_category,
            score: w.score,
        }
    }
}

#[derive(Deserialize)]
struct SymbolRowWire {
    name: String,
    kind: String,
    relative_path: String,
    start_line: usize,
    signature: Option<String>,
    parent_name: Option<String>,
}

impl From<SymbolRowWire> for SymbolRow {
    fn from(w: SymbolRowWire) -> Self {
        SymbolRow {
            name: w.name,
            kind: w.kind,
            relative_path: w.relative_path,
            start_line: w.start_line,
            signature: w.signature,
            parent_name: w.parent_name,
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn create_collection(&self, name: &str, dim: usize) -> Result<()> {
        self.create_collection_with_mode(name, dim, CollectionMode::Hybrid)
            .await
    }

    async fn has_collection(&self, name: &str) -> bool {
        self.request(reqwest::Method::GET, &format!("/collections/{name}"))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/collections/{name}"))
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            if let Ok(mut m) = self.modes.write() {
                m.remove(name);
            }
            return Ok(());
        }
        Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()))
    }

    async fn insert(&self, name: &str, docs: Vec<Document>) -> Result<()> {
        for batch in docs.chunks(INSERT_BATCH_SIZE) {
            let resp = self
                .request(reqwest::Method::POST, &format!("/collections/{name}/points"))
                .json(batch)
                .send()
                .await
                .map_err(VectorStoreError::transport)?;
            if !resp.status().is_success() {
                return Err(VectorStoreError::PartialInsert(
                    resp.text().await.unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }

    async fn dense_search(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{name}/search/dense"),
            )
            .json(&DenseSearchBody {
                vector: query_vector,
                limit,
                extension_filter,
            })
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if !resp.status().is_success() {
            return Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()));
        }
        let wire: Vec<SearchResultWire> = resp.json().await.map_err(VectorStoreError::transport)?;
        Ok(wire.into_iter().map(SearchResult::from).collect())
    }

    async fn lexical_scroll(
        &self,
        name: &str,
        query_text: &str,
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        if self.mode_of(name) == Some(CollectionMode::DenseOnly) {
            // Dense-only collections have no tokenized text index to scroll.
            return Ok(Vec::new());
        }
        let resp = self
            .request(reqwest::Method::POST, &format!("/collections/{name}/scroll"))
            .json(&ScrollBody {
                content_contains: query_text,
                limit,
                extension_filter,
            })
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if !resp.status().is_success() {
            return Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()));
        }
        let wire: Vec<SearchResultWire> = resp.json().await.map_err(VectorStoreError::transport)?;
        Ok(wire.into_iter().map(SearchResult::from).collect())
    }

    async fn delete_by_path(&self, name: &str, rel_path: &str) -> Result<()> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{name}/delete_by_path"),
            )
            .json(&DeleteByPathBody { relative_path: rel_path })
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()))
    }

    async fn get_by_id(&self, name: &str, id: &str) -> Result<Option<Document>> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/collections/{name}/points/{id}"))
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()));
        }
        Ok(Some(resp.json().await.map_err(VectorStoreError::transport)?))
    }

    async fn update_point(&self, name: &str, document: Document) -> Result<()> {
        let id = document.id.clone();
        let resp = self
            .request(reqwest::Method::PUT, &format!("/collections/{name}/points/{id}"))
            .json(&document)
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()))
    }

    async fn list_symbols(&self, name: &str, query: SymbolQuery) -> Result<Vec<SymbolRow>> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/collections/{name}/symbols"))
            .json(&ListSymbolsBody {
                path_filter: query.path_filter,
                kind_filter: query.kind_filter,
                limit: crate::store::LIST_SYMBOLS_LIMIT,
            })
            .send()
            .await
            .map_err(VectorStoreError::transport)?;
        if !resp.status().is_success() {
            return Err(VectorStoreError::Protocol(resp.text().await.unwrap_or_default()));
        }
        let wire: Vec<SymbolRowWire> = resp.json().await.map_err(VectorStoreError::transport)?;
        Ok(wire
            .into_iter()
            .map(SymbolRow::from)
            .filter(|row| !row.name.is_empty())
            .take(crate::store::LIST_SYMBOLS_LIMIT)
            .collect())
    }
}
