//! `eidetic-targeted-reindex`: the detached subprocess the stop-hook spawns
//! (spec.md §6 step 7). Takes a manifest path on argv, re-indexes exactly
//! the files it names, and exits — there is no RPC caller waiting on this
//! process, so failures go to stderr and the exit code, not a response.

use eidetic_embedding::{EmbeddingCache, HttpEmbeddingProvider, HttpEmbeddingProviderConfig};
use eidetic_shadow_index::reindex::reindex_files;
use eidetic_vectorstore::{HttpVectorStore, HttpVectorStoreConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReindexManifest {
    project_path: String,
    modified_files: Vec<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn data_root() -> PathBuf {
    env_var("EIDETIC_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".eidetic"))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let manifest_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: eidetic-targeted-reindex <manifest-path>");
            std::process::exit(2);
        }
    };

    let manifest_bytes = match std::fs::read(&manifest_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("fatal: failed to read manifest {manifest_path:?}: {err}");
            std::process::exit(1);
        }
    };
    let manifest: ReindexManifest = match serde_json::from_slice(&manifest_bytes) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("fatal: malformed manifest {manifest_path:?}: {err}");
            std::process::exit(1);
        }
    };

    let timeout = Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS);

    let embedding_base_url = match env_var("EIDETIC_EMBEDDING_BASE_URL") {
        Some(url) => url,
        None => {
            eprintln!("fatal: EIDETIC_EMBEDDING_BASE_URL is not set; cannot reach the embedding collaborator");
            std::process::exit(1);
        }
    };
    let vector_store_base_url = match env_var("EIDETIC_VECTOR_STORE_BASE_URL") {
        Some(url) => url,
        None => {
            eprintln!("fatal: EIDETIC_VECTOR_STORE_BASE_URL is not set; cannot reach the vector store");
            std::process::exit(1);
        }
    };

    let provider = HttpEmbeddingProvider::new(HttpEmbeddingProviderConfig {
        base_url: embedding_base_url,
        model: env_var("EIDETIC_EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        api_key: env_var("EIDETIC_EMBEDDING_API_KEY"),
        timeout,
    });

    let data_root = data_root();
    let embeddings = EmbeddingCache::new(Box::new(provider), data_root.join("cache/embeddings"));
    if let Err(err) = embeddings.initialize().await {
        eprintln!("fatal: failed to initialize embedding cache: {err}");
        std::process::exit(1);
    }

    let store = HttpVectorStore::new(HttpVectorStoreConfig {
        base_url: vector_store_base_url,
        api_key: env_var("EIDETIC_VECTOR_STORE_API_KEY"),
        timeout,
    });

    match reindex_files(&store, &embeddings, &data_root, &manifest.project_path, &manifest.modified_files).await {
        Ok(result) => {
            log::info!(
                "targeted reindex of {}: {} updated, {} deleted",
                manifest.project_path,
                result.updated.len(),
                result.deleted.len(),
            );
            let _ = std::fs::remove_file(&manifest_path);
        }
        Err(err) => {
            eprintln!("fatal: targeted reindex of {} failed: {err}", manifest.project_path);
            std::process::exit(1);
        }
    }
}
