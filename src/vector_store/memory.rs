//! In-memory exhaustive vector index.
//!
//! Linear scan over every stored vector. A video yields hundreds of chunks at
//! most, so a flat scan is both exact and fast enough.

use super::{cosine_similarity, RetrievedChunk, VectorIndex};
use crate::chunking::Chunk;
use crate::error::{Result, VidsageError};

/// In-memory index of `(chunk, vector)` pairs with a fixed dimension.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimensions: usize,
}

impl MemoryIndex {
    /// Build an index from chunks and their vectors, paired by position.
    ///
    /// The dimension is taken from the first vector; any other vector of a
    /// different length fails with `DimensionMismatch`. So does a vector
    /// count that differs from the chunk count, reported as
    /// `expected: chunks, actual: vectors`.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.is_empty() || vectors.is_empty() {
            return Err(VidsageError::EmptyIndex);
        }
        if chunks.len() != vectors.len() {
            return Err(VidsageError::DimensionMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(VidsageError::Backend("embedding backend returned an empty vector".to_string()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(VidsageError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        Ok(Self {
            entries: chunks.into_iter().zip(vectors).collect(),
            dimensions,
        })
    }
}

impl VectorIndex for MemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn chunks(&self) -> Vec<&Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk).collect()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if query.len() != self.dimensions {
            return Err(VidsageError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, (_, vector))| (position, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| rank(b.1).total_cmp(&rank(a.1)).then(a.0.cmp(&b.0)));
        scored.truncate(k.min(self.entries.len()));

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let chunk = &self.entries[position].0;
                RetrievedChunk {
                    chunk_id: chunk.id,
                    chunk_text: chunk.text.clone(),
                    similarity_score: score,
                }
            })
            .collect())
    }
}

/// Sort key for a score. NaN ranks below every real score.
fn rank(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}
