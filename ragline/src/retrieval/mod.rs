//! Retrieval-augmented lookup over a precomputed embedding index.
//!
//! The index is built offline by [`IndexBuilder`] and stored as an
//! [`IndexFile`]. At startup it is loaded into a [`VectorIndex`] (an HNSW
//! graph from `hnsw_rs`), and each inbound query goes through
//! [`Retriever::lookup`].

mod builder;
mod error;
mod file;
mod index;
mod retriever;

pub use builder::{CorpusFormat, IndexBuilder, Passage, parse_corpus};
pub use error::IndexError;
pub use file::{IndexEntry, IndexFile};
pub use index::{Hit, IndexParams, VectorIndex};
pub use retriever::Retriever;
