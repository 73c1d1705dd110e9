//! Query-time lookup: embed the user's text and search the index.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::SharedEmbeddingProvider;
use crate::error::Result;

use super::index::{Hit, VectorIndex};

/// Embeds queries and searches a [`VectorIndex`].
#[derive(Clone)]
pub struct Retriever {
    provider: SharedEmbeddingProvider,
    index: Arc<VectorIndex>,
    top_k: usize,
    min_score: Option<f32>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("index", &self.index)
            .field("top_k", &self.top_k)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Default number of passages spliced into the prompt.
    pub const DEFAULT_TOP_K: usize = 1;

    /// Create a retriever returning the single best match.
    #[must_use]
    pub fn new(provider: SharedEmbeddingProvider, index: Arc<VectorIndex>) -> Self {
        Self {
            provider,
            index,
            top_k: Self::DEFAULT_TOP_K,
            min_score: None,
        }
    }

    /// Sets how many passages to return.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Drops hits scoring below `min_score`.
    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// The underlying index.
    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Find reference passages for `text`, best first.
    ///
    /// The query is embedded with the model the index was built with.
    pub async fn lookup(&self, text: &str) -> Result<Vec<Hit>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.provider.embed_single(self.index.model(), text).await?;
        let mut hits = self.index.search(&embedding.vector, self.top_k)?;

        if let Some(min_score) = self.min_score {
            hits.retain(|hit| hit.score >= min_score);
        }

        debug!(
            hits = hits.len(),
            best = hits.first().map(|h| h.score),
            "retrieval lookup"
        );
        Ok(hits)
    }
}
