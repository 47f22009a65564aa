//! Vector index abstraction for VidSage.
//!
//! Every ingested video owns one [`VectorIndex`]; the [`IndexRegistry`] maps
//! video ids to their current index.

mod memory;
mod registry;

pub use memory::MemoryIndex;
pub use registry::IndexRegistry;

use crate::chunking::Chunk;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Sequence id of the chunk within its video.
    pub chunk_id: usize,
    /// Text content of the chunk.
    pub chunk_text: String,
    /// Cosine similarity to the query (higher is better).
    pub similarity_score: f32,
}

/// Nearest-neighbour index over the chunks of a single video.
///
/// Implementations only promise the search contract: results ordered by
/// descending similarity, ties broken by lower chunk id, at most `k` results.
pub trait VectorIndex: Send + Sync {
    /// Dimension shared by every stored vector.
    fn dimensions(&self) -> usize;

    /// Number of stored chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored chunks in sequence order.
    fn chunks(&self) -> Vec<&Chunk>;

    /// Find the `k` chunks most similar to `query`.
    ///
    /// Fails with `DimensionMismatch` if `query` has the wrong dimension.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
