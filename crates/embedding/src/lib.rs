//! Content-addressed, two-tier embedding cache with provider retry/backoff
//! (spec.md §4.5). The provider itself (an `embed(text[]) -> vector[]` HTTP
//! service) is an external collaborator (spec.md §1); this crate owns the
//! caching, batching, and retry policy around it.

mod cache;
mod cost;
mod error;
mod provider;

pub use cache::{EmbeddingCache, DEFAULT_EMBEDDING_BATCH_SIZE, DEFAULT_LRU_CAPACITY};
pub use cost::{estimate_tokens, per_million_rate, CostEstimate};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider, HttpEmbeddingProviderConfig, ProviderError};
