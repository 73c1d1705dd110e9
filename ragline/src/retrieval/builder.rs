//! Offline index construction from a text corpus.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingRequest, SharedEmbeddingProvider};
use crate::error::{LlmError, Result};

use super::file::{IndexEntry, IndexFile};
use super::IndexError;

/// A passage of reference text before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Passage ID.
    pub id: String,
    /// Passage text.
    pub text: String,
}

/// Corpus layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    /// Plain text, passages separated by blank lines.
    Text,
    /// One JSON object per line with `text` and an optional `id`.
    JsonLines,
}

impl CorpusFormat {
    /// Pick the format from the file extension (`.jsonl` or `.ndjson` for
    /// JSON lines, anything else is plain text).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "ndjson") => Self::JsonLines,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonLine {
    #[serde(default)]
    id: Option<String>,
    text: String,
}

/// Split a corpus into passages.
pub fn parse_corpus(
    content: &str,
    format: CorpusFormat,
) -> std::result::Result<Vec<Passage>, IndexError> {
    match format {
        CorpusFormat::Text => Ok(parse_text(content)),
        CorpusFormat::JsonLines => parse_json_lines(content),
    }
}

fn parse_text(content: &str) -> Vec<Passage> {
    let mut passages = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |current: &mut Vec<&str>| {
        if !current.is_empty() {
            passages.push(Passage {
                id: format!("passage-{}", passages.len() + 1),
                text: current.join("\n"),
            });
            current.clear();
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut current);

    passages
}

fn parse_json_lines(content: &str) -> std::result::Result<Vec<Passage>, IndexError> {
    let mut passages = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line_no = n + 1;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: JsonLine = serde_json::from_str(line)
            .map_err(|e| IndexError::format(format!("line {line_no}: {e}")))?;
        let text = parsed.text.trim();
        if text.is_empty() {
            warn!(line = line_no, "skipping passage with empty text");
            continue;
        }
        passages.push(Passage {
            id: parsed.id.unwrap_or_else(|| format!("line-{line_no}")),
            text: text.to_owned(),
        });
    }
    Ok(passages)
}

/// Embeds passages in batches and assembles an [`IndexFile`].
#[derive(Clone)]
pub struct IndexBuilder {
    provider: SharedEmbeddingProvider,
    model: String,
    batch_size: usize,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl IndexBuilder {
    /// Default number of passages per embedding request.
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    /// Create a builder using the provider's default embedding model.
    #[must_use]
    pub fn new(provider: SharedEmbeddingProvider) -> Self {
        let model = provider.default_embedding_model().to_owned();
        Self {
            provider,
            model,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the batch size. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed all passages and return the index.
    pub async fn build(&self, passages: &[Passage]) -> Result<IndexFile> {
        if passages.is_empty() {
            return Err(IndexError::Empty.into());
        }

        let mut file = IndexFile::new(self.model.clone(), 0);
        let batches = passages.len().div_ceil(self.batch_size);

        for (batch_no, batch) in passages.chunks(self.batch_size).enumerate() {
            let input: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let request = EmbeddingRequest::new(self.model.clone(), input);
            let vectors = self.provider.embed(&request).await?.into_vectors();

            if vectors.len() != batch.len() {
                return Err(LlmError::response_format(
                    format!("{} embeddings", batch.len()),
                    format!("{} embeddings", vectors.len()),
                )
                .into());
            }

            for (passage, embedding) in batch.iter().zip(vectors) {
                if file.dimension == 0 {
                    file.dimension = embedding.len();
                }
                file.push(IndexEntry {
                    id: passage.id.clone(),
                    text: passage.text.clone(),
                    embedding,
                })?;
            }
            debug!(batch = batch_no + 1, batches, "embedded batch");
        }

        info!(
            model = %file.model,
            entries = file.len(),
            dimension = file.dimension,
            "index built"
        );
        Ok(file)
    }

    /// Read a corpus file, embed it and return the index.
    pub async fn build_from_path(&self, input: impl AsRef<Path>) -> Result<IndexFile> {
        let input = input.as_ref();
        let content = tokio::fs::read_to_string(input).await?;
        let passages = parse_corpus(&content, CorpusFormat::from_path(input))?;
        info!(path = %input.display(), passages = passages.len(), "parsed corpus");
        self.build(&passages).await
    }
}
