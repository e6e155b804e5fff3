//! Remote embedding and reranking clients.
//!
//! Both services follow the text-embeddings-inference HTTP contract:
//! `POST /embed` returns one unit-normalized vector per input text, and
//! `POST /rerank` scores candidate texts against a query. The embedding
//! dimension is fixed by the chunk index mapping; a startup probe refuses
//! to run against a model of any other dimension.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{EmbedError, RetrievalError};
use crate::store::EMBEDDING_DIM;

/// Embeds texts into the dense retrieval space.
///
/// The trait seam exists so retrieval logic can be exercised without a
/// running service; production uses [`HttpEmbedder`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError`] on transport failures or malformed responses.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError`] on transport failures or malformed responses.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors.pop().ok_or(EmbedError::ShortResponse {
            got: 0,
            expected: 1,
        })
    }
}

/// HTTP embedder against a text-embeddings-inference style service.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpEmbedder {
    /// Creates an embedder for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Request`] when the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EmbedError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| EmbedError::Request {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Probes the service once and verifies the embedding dimension.
    ///
    /// The chunk index maps `embedding` as a fixed 1024-float dense vector;
    /// running against a model of any other dimension would silently
    /// corrupt the index, so a mismatch is fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::DimensionMismatch`] on a wrong dimension and
    /// [`EmbedError`] for transport failures.
    pub async fn probe_dimension(&self) -> Result<(), EmbedError> {
        let vector = self.embed("dimension probe").await?;
        check_dimension(vector.len())
    }
}

/// Verifies a returned vector length against the index mapping.
///
/// # Errors
///
/// Returns [`EmbedError::DimensionMismatch`] when the length differs.
pub fn check_dimension(actual: usize) -> Result<(), EmbedError> {
    if actual == EMBEDDING_DIM {
        Ok(())
    } else {
        Err(EmbedError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .http
            .post(format!("{}/embed", self.base_url))
            .timeout(self.timeout)
            .json(&json!({"inputs": texts, "normalize": true, "truncate": true}))
            .send()
            .await
            .map_err(|err| EmbedError::Request {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Request {
                message: format!("embedding service returned {status}: {body}"),
            });
        }

        let vectors: Vec<Vec<f32>> =
            response.json().await.map_err(|err| EmbedError::Request {
                message: format!("failed to decode embedding response: {err}"),
            })?;
        if vectors.len() != texts.len() {
            return Err(EmbedError::ShortResponse {
                got: vectors.len(),
                expected: texts.len(),
            });
        }
        Ok(vectors)
    }
}

/// One scored candidate from the reranker.
#[derive(Debug, Clone, Deserialize)]
struct RerankItem {
    index: usize,
    score: f32,
}

/// Orders rerank items deterministically: score descending, then original
/// index ascending for equal scores.
fn order_items(mut items: Vec<RerankItem>) -> Vec<RerankItem> {
    items.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.index.cmp(&b.index))
    });
    items
}

/// HTTP cross-encoder reranker.
#[derive(Debug, Clone)]
pub struct HttpReranker {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpReranker {
    /// Creates a reranker for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Rerank`] when the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| RetrievalError::Rerank {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Reranks `texts` against `query` and returns the indices of the top
    /// `top_n` candidates, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Rerank`] on transport failures or
    /// malformed responses.
    pub async fn rerank(
        &self,
        query: &str,
        texts: &[String],
        top_n: usize,
    ) -> Result<Vec<usize>, RetrievalError> {
        if texts.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let response = self
            .http
            .post(format!("{}/rerank", self.base_url))
            .timeout(self.timeout)
            .json(&json!({"query": query, "texts": texts, "raw_scores": false}))
            .send()
            .await
            .map_err(|err| RetrievalError::Rerank {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Rerank {
                message: format!("reranker returned {status}: {body}"),
            });
        }

        let items: Vec<RerankItem> =
            response.json().await.map_err(|err| RetrievalError::Rerank {
                message: format!("failed to decode rerank response: {err}"),
            })?;
        let ordered = order_items(items);
        Ok(ordered
            .into_iter()
            .filter(|item| item.index < texts.len())
            .take(top_n)
            .map(|item| item.index)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimension_accepts_mapping() {
        assert!(check_dimension(1024).is_ok());
    }

    #[test]
    fn test_check_dimension_rejects_mismatch() {
        let err = check_dimension(768).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch {
                expected: 1024,
                actual: 768
            }
        ));
    }

    #[test]
    fn test_order_items_by_score_desc() {
        let ordered = order_items(vec![
            RerankItem { index: 0, score: 0.2 },
            RerankItem { index: 1, score: 0.9 },
            RerankItem { index: 2, score: 0.5 },
        ]);
        let indices: Vec<usize> = ordered.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_order_items_tie_break_is_original_index() {
        let ordered = order_items(vec![
            RerankItem { index: 2, score: 0.5 },
            RerankItem { index: 0, score: 0.5 },
            RerankItem { index: 1, score: 0.5 },
        ]);
        let indices: Vec<usize> = ordered.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
