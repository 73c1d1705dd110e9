//! In-memory ANN index over the precomputed embeddings.

use std::path::Path;

use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

use super::file::{IndexFile, has_usable_norm};
use super::IndexError;

/// A passage matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    /// Passage ID.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Cosine similarity to the query, `1 - cosine distance`.
    pub score: f32,
}

/// HNSW graph parameters.
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    /// Maximum links per node.
    pub max_nb_connection: usize,
    /// Candidate list size while building.
    pub ef_construction: usize,
    /// Candidate list size while searching. Raised to at least `k`.
    pub ef_search: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            max_nb_connection: 16,
            ef_construction: 200,
            ef_search: 64,
        }
    }
}

/// hnsw_rs caps the number of layers at 16.
const MAX_LAYER: usize = 16;

#[derive(Debug)]
struct Passage {
    id: String,
    text: String,
}

/// Read-only cosine-similarity index built from an [`IndexFile`].
///
/// Data IDs in the graph are positions in `passages`.
pub struct VectorIndex {
    graph: Hnsw<'static, f32, DistCosine>,
    passages: Vec<Passage>,
    model: String,
    dimension: usize,
    ef_search: usize,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("len", &self.passages.len())
            .field("ef_search", &self.ef_search)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Build the graph from a validated index file.
    pub fn build(file: IndexFile, params: IndexParams) -> std::result::Result<Self, IndexError> {
        file.validate()?;

        let max_elements = file.entries.len().max(1);
        let graph = Hnsw::<f32, DistCosine>::new(
            params.max_nb_connection,
            max_elements,
            MAX_LAYER,
            params.ef_construction,
            DistCosine {},
        );

        let mut passages = Vec::with_capacity(file.entries.len());
        for (data_id, entry) in file.entries.into_iter().enumerate() {
            graph.insert_slice((entry.embedding.as_slice(), data_id));
            passages.push(Passage {
                id: entry.id,
                text: entry.text,
            });
        }

        info!(
            model = %file.model,
            dimension = file.dimension,
            entries = passages.len(),
            "built vector index"
        );

        Ok(Self {
            graph,
            passages,
            model: file.model,
            dimension: file.dimension,
            ef_search: params.ef_search,
        })
    }

    /// Load an index file and build the graph.
    pub async fn load(path: impl AsRef<Path>, params: IndexParams) -> Result<Self> {
        let file = IndexFile::load(path).await?;
        Ok(Self::build(file, params)?)
    }

    /// Embedding model of the indexed passages.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embedding dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Find the `k` passages most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> std::result::Result<Vec<Hit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if !has_usable_norm(query) {
            debug!("query embedding has zero norm, no hits");
            return Ok(Vec::new());
        }

        let ef_search = self.ef_search.max(k);
        let mut hits: Vec<Hit> = self
            .graph
            .search(query, k, ef_search)
            .into_iter()
            .filter_map(|n| {
                self.passages.get(n.d_id).map(|p| Hit {
                    id: p.id.clone(),
                    text: p.text.clone(),
                    score: 1.0 - n.distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!(k, ef_search, returned = hits.len(), "index search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::IndexEntry;

    fn sample_file() -> IndexFile {
        let mut file = IndexFile::new("test-model", 3);
        for (id, embedding) in [
            ("miles", vec![1.0, 0.0, 0.0]),
            ("hotels", vec![0.0, 1.0, 0.0]),
            ("mixed", vec![0.7, 0.7, 0.0]),
        ] {
            file.push(IndexEntry {
                id: id.to_owned(),
                text: format!("about {id}"),
                embedding,
            })
            .unwrap();
        }
        file
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(sample_file(), IndexParams::default()).unwrap()
    }

    mod search {
        use super::*;

        #[test]
        fn best_match_first() {
            let index = sample_index();
            let hits = index.search(&[1.0, 0.05, 0.0], 1).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id, "miles");
            assert_eq!(hits[0].text, "about miles");
            assert!(hits[0].score > 0.99);
        }

        #[test]
        fn sorted_descending() {
            let index = sample_index();
            let hits = index.search(&[1.0, 0.2, 0.0], 3).unwrap();
            assert_eq!(hits.len(), 3);
            assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
            assert_eq!(hits[0].id, "miles");
            assert_eq!(hits[1].id, "mixed");
        }

        #[test]
        fn k_larger_than_index() {
            let hits = sample_index().search(&[0.0, 1.0, 0.0], 10).unwrap();
            assert_eq!(hits.len(), 3);
            assert_eq!(hits[0].id, "hotels");
        }

        #[test]
        fn k_zero_returns_nothing() {
            assert!(sample_index().search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
        }

        #[test]
        fn zero_query_returns_nothing() {
            assert!(sample_index().search(&[0.0, 0.0, 0.0], 2).unwrap().is_empty());
        }

        #[test]
        fn dimension_mismatch() {
            assert_eq!(
                sample_index().search(&[1.0, 0.0], 1),
                Err(IndexError::DimensionMismatch {
                    expected: 3,
                    actual: 2
                })
            );
        }

        #[test]
        fn small_ef_search_still_returns_k_hits() {
            let mut file = IndexFile::new("test-model", 16);
            for i in 0..200 {
                let embedding = (0..16)
                    .map(|j| (i as f32 * 0.37 + j as f32 * 1.3).sin())
                    .collect();
                file.push(IndexEntry {
                    id: format!("p{i}"),
                    text: format!("passage {i}"),
                    embedding,
                })
                .unwrap();
            }
            let params = IndexParams {
                ef_search: 1,
                ..IndexParams::default()
            };
            let index = VectorIndex::build(file, params).unwrap();

            let query: Vec<f32> = (0..16).map(|j| (42.0 * 0.37 + j as f32 * 1.3).sin()).collect();
            let hits = index.search(&query, 5).unwrap();

            assert_eq!(hits.len(), 5);
            assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
            let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
            ids.dedup();
            assert_eq!(ids.len(), 5);
        }

        #[test]
        fn empty_index_has_no_hits() {
            let index =
                VectorIndex::build(IndexFile::new("test-model", 3), IndexParams::default()).unwrap();
            assert!(index.is_empty());
            assert!(index.search(&[1.0, 0.0, 0.0], 3).unwrap().is_empty());
        }
    }

    mod build {
        use super::*;

        #[test]
        fn rejects_invalid_file() {
            let mut file = sample_file();
            file.entries[1].embedding = vec![0.0, 0.0, 0.0];
            assert!(matches!(
                VectorIndex::build(file, IndexParams::default()),
                Err(IndexError::ZeroNorm { .. })
            ));
        }

        #[test]
        fn keeps_metadata() {
            let index = sample_index();
            assert_eq!(index.model(), "test-model");
            assert_eq!(index.dimension(), 3);
            assert_eq!(index.len(), 3);
        }
    }
}
