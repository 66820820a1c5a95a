use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw failure from a single provider call, before the cache's retry policy
/// (spec.md §4.5 step 4) decides what to do with it.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
    /// Parsed `Retry-After` header, already bounded to 60s by the caller
    /// that observed it (the HTTP provider), per spec.md §4.5 step 4.
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider error (status {:?}): {}", self.status, self.message)
    }
}

/// `embed(text[]) -> vector[]` HTTP collaborator (spec.md §1, §4.5): a
/// single call must return exactly one vector per input, in order. The
/// trait's only implementor in production is [`HttpEmbeddingProvider`]; a
/// fake provider lives in each dependent crate's test module so the retry
/// and cache logic can be exercised without a network.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct HttpEmbeddingProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: HttpEmbeddingProviderConfig,
}

impl HttpEmbeddingProvider {
    #[must_use]
    pub fn new(config: HttpEmbeddingProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let secs: u64 = raw.trim().parse().ok()?;
    Some(Duration::from_secs(secs).min(Duration::from_secs(60)))
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let resp = self
            .client
            .post(format!("{}/embed", self.config.base_url.trim_end_matches('/')))
            .header(
                reqwest::header::AUTHORIZATION,
                self.config
                    .api_key
                    .as_deref()
                    .map(|k| format!("Bearer {k}"))
                    .unwrap_or_default(),
            )
            .json(&EmbedRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| ProviderError {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
                retry_after: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError {
                status: Some(status.as_u16()),
                message,
                retry_after,
            });
        }

        let body: EmbedResponse = resp.json().await.map_err(|e| ProviderError {
            status: None,
            message: e.to_string(),
            retry_after: None,
        })?;
        Ok(body.vectors)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
