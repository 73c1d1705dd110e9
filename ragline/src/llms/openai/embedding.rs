//! OpenAI Embedding API implementation.

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::error::{LlmError, Result};

use super::client::OpenAI;
use super::types::{OpenAIEmbeddingRequest, OpenAIEmbeddingResponse};

/// Output dimension of `text-embedding-3-small`.
const SMALL_EMBEDDING_DIMENSION: usize = 1536;

#[async_trait]
impl EmbeddingProvider for OpenAI {
    async fn embed(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        let url = self.embeddings_url();
        let model = if request.model.is_empty() {
            self.embedding_model()
        } else {
            request.model.as_str()
        };

        let body = OpenAIEmbeddingRequest {
            model,
            input: &request.input,
            encoding_format: "float",
            dimensions: request.dimensions,
        };
        debug!(model, inputs = request.input.len(), "requesting embeddings");

        let response = self
            .build_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(LlmError::from)?;
        let parsed: OpenAIEmbeddingResponse = serde_json::from_str(&response_text).map_err(|e| {
            Self::parse_failure("valid OpenAI embedding response", &e, &response_text)
        })?;

        if parsed.data.len() != request.input.len() {
            return Err(LlmError::response_format(
                format!("{} embeddings", request.input.len()),
                format!("{} embeddings", parsed.data.len()),
            )
            .into());
        }

        let mut embeddings: Vec<Embedding> = parsed
            .data
            .into_iter()
            .map(|d| Embedding::new(d.embedding, d.index))
            .collect();
        embeddings.sort_by_key(|e| e.index);

        Ok(EmbeddingResponse {
            embeddings,
            model: parsed.model,
            usage: parsed.usage.map(|u| EmbeddingUsage {
                prompt_tokens: u.prompt_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    fn default_embedding_model(&self) -> &str {
        self.embedding_model()
    }

    fn embedding_dimension(&self) -> Option<usize> {
        (self.embedding_model() == "text-embedding-3-small").then_some(SMALL_EMBEDDING_DIMENSION)
    }
}
