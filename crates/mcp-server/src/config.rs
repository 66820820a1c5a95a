use eidetic_embedding::HttpEmbeddingProviderConfig;
use eidetic_vectorstore::HttpVectorStoreConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// *ConfigError* (spec.md §7): fatal at startup. Surfaced on stderr, not
/// over the RPC protocol, since it prevents the server from ever starting.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set; the server cannot reach its {1} collaborator")]
    MissingBaseUrl(&'static str, &'static str),

    #[error(
        "{0} points at a non-local host ({1}) but no API key was provided via {2}; \
         set {2} or point {0} at a local instance"
    )]
    MissingApiKey(&'static str, String, &'static str),

    #[error("{0} is not a valid integer: {1}")]
    InvalidInt(&'static str, String),
}

pub struct AppConfig {
    pub data_root: PathBuf,
    pub embedding: HttpEmbeddingProviderConfig,
    pub vector_store: HttpVectorStoreConfig,
    pub indexing_concurrency: Option<usize>,
    pub embedding_batch_size: Option<usize>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_local_host(base_url: &str) -> bool {
    base_url.contains("localhost") || base_url.contains("127.0.0.1") || base_url.contains("::1")
}

fn parse_optional_usize(name: &'static str) -> Result<Option<usize>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidInt(name, raw)),
    }
}

impl AppConfig {
    /// Loads configuration from the environment (spec.md §6 "Persisted
    /// state layout": `<dataRoot>` is a user-home subdirectory by
    /// default). Missing an embedding/vector-store base URL, or a missing
    /// API key for a non-local embedding provider, is a *ConfigError*
    /// (spec.md §7) — both are fatal at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_root = env_var("EIDETIC_DATA_ROOT").map(PathBuf::from).unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".eidetic")
        });

        let embedding_base_url = env_var("EIDETIC_EMBEDDING_BASE_URL")
            .ok_or(ConfigError::MissingBaseUrl("EIDETIC_EMBEDDING_BASE_URL", "embedding provider"))?;
        let embedding_api_key = env_var("EIDETIC_EMBEDDING_API_KEY");
        if embedding_api_key.is_none() && !is_local_host(&embedding_base_url) {
            return Err(ConfigError::MissingApiKey(
                "EIDETIC_EMBEDDING_BASE_URL",
                embedding_base_url,
                "EIDETIC_EMBEDDING_API_KEY",
            ));
        }

        let vector_store_base_url = env_var("EIDETIC_VECTOR_STORE_BASE_URL")
            .ok_or(ConfigError::MissingBaseUrl("EIDETIC_VECTOR_STORE_BASE_URL", "vector store"))?;
        let vector_store_api_key = env_var("EIDETIC_VECTOR_STORE_API_KEY");
        if vector_store_api_key.is_none() && !is_local_host(&vector_store_base_url) {
            return Err(ConfigError::MissingApiKey(
                "EIDETIC_VECTOR_STORE_BASE_URL",
                vector_store_base_url,
                "EIDETIC_VECTOR_STORE_API_KEY",
            ));
        }

        let timeout = Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS);

        Ok(Self {
            data_root,
            embedding: HttpEmbeddingProviderConfig {
                base_url: embedding_base_url,
                model: env_var("EIDETIC_EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                api_key: embedding_api_key,
                timeout,
            },
            vector_store: HttpVectorStoreConfig {
                base_url: vector_store_base_url,
                api_key: vector_store_api_key,
                timeout,
            },
            indexing_concurrency: parse_optional_usize("EIDETIC_INDEXING_CONCURRENCY")?,
            embedding_batch_size: parse_optional_usize("EIDETIC_EMBEDDING_BATCH_SIZE")?,
        })
    }
}
