//! On-disk index format.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::IndexError;

/// A precomputed embedding index as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    /// Embedding model the entries were produced with. Queries must be
    /// embedded with the same model.
    pub model: String,
    /// Length of every embedding.
    pub dimension: usize,
    /// Indexed passages.
    pub entries: Vec<IndexEntry>,
}

/// One indexed passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Stable passage ID.
    pub id: String,
    /// Reference text spliced into the prompt on a match.
    pub text: String,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
}

impl IndexFile {
    /// Create an empty index for the given model and dimension.
    #[must_use]
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate and append an entry.
    pub fn push(&mut self, entry: IndexEntry) -> std::result::Result<(), IndexError> {
        check_entry(self.dimension, &entry)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Check the dimension and norm of every entry.
    pub fn validate(&self) -> std::result::Result<(), IndexError> {
        if self.dimension == 0 {
            return Err(IndexError::format("dimension must be positive"));
        }
        self.entries
            .iter()
            .try_for_each(|entry| check_entry(self.dimension, entry))
    }

    /// Load and validate an index file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file: Self = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::format(format!("{}: {e}", path.display())))?;
        file.validate()?;
        debug!(path = %path.display(), entries = file.len(), dimension = file.dimension, "loaded index file");
        Ok(file)
    }

    /// Write the index as JSON, creating parent directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(self)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

fn check_entry(dimension: usize, entry: &IndexEntry) -> std::result::Result<(), IndexError> {
    if entry.embedding.len() != dimension {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: entry.embedding.len(),
        });
    }
    if !has_usable_norm(&entry.embedding) {
        return Err(IndexError::ZeroNorm {
            id: entry.id.clone(),
        });
    }
    Ok(())
}

/// Returns true if the vector can be compared by cosine similarity.
pub(crate) fn has_usable_norm(vector: &[f32]) -> bool {
    let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
    norm_sq.is_finite() && norm_sq > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_owned(),
            text: format!("text {id}"),
            embedding,
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn push_checks_dimension() {
            let mut file = IndexFile::new("m", 3);
            assert!(file.push(entry("a", vec![1.0, 0.0, 0.0])).is_ok());
            assert_eq!(
                file.push(entry("b", vec![1.0, 0.0])),
                Err(IndexError::DimensionMismatch {
                    expected: 3,
                    actual: 2
                })
            );
            assert_eq!(file.len(), 1);
        }

        #[test]
        fn zero_norm_rejected() {
            let mut file = IndexFile::new("m", 2);
            assert_eq!(
                file.push(entry("z", vec![0.0, 0.0])),
                Err(IndexError::ZeroNorm { id: "z".to_owned() })
            );
        }

        #[test]
        fn nan_rejected() {
            assert!(!has_usable_norm(&[f32::NAN, 1.0]));
        }

        #[test]
        fn zero_dimension_invalid() {
            assert!(matches!(
                IndexFile::new("m", 0).validate(),
                Err(IndexError::Format(_))
            ));
        }
    }

    mod io {
        use super::*;

        #[tokio::test]
        async fn save_then_load() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("index.json");

            let mut file = IndexFile::new("text-embedding-3-small", 2);
            file.push(entry("a", vec![0.6, 0.8])).unwrap();
            file.save(&path).await.unwrap();

            let loaded = IndexFile::load(&path).await.unwrap();
            assert_eq!(loaded, file);
        }

        #[tokio::test]
        async fn load_rejects_bad_dimension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("index.json");
            tokio::fs::write(
                &path,
                r#"{"model":"m","dimension":3,"entries":[{"id":"a","text":"t","embedding":[1.0]}]}"#,
            )
            .await
            .unwrap();

            let err = IndexFile::load(&path).await.unwrap_err();
            assert!(matches!(
                err,
                crate::Error::Index(IndexError::DimensionMismatch { .. })
            ));
        }

        #[tokio::test]
        async fn load_rejects_malformed_json() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("index.json");
            tokio::fs::write(&path, "{").await.unwrap();

            let err = IndexFile::load(&path).await.unwrap_err();
            assert!(matches!(err, crate::Error::Index(IndexError::Format(_))));
        }

        #[tokio::test]
        async fn load_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = IndexFile::load(dir.path().join("nope.json"))
                .await
                .unwrap_err();
            assert!(matches!(err, crate::Error::Io(_)));
        }
    }
}
