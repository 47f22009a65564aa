//! Process-wide map from video id to its current vector index.
//!
//! Each video's index is an immutable `Arc`. Ingest builds a complete new
//! index off to the side and then swaps the `Arc` in under a short write
//! lock, so a concurrent search holds either the old index or the new one,
//! never a partial one. Ingests of the same video are serialised by a
//! per-video mutex; ingests of different videos only share the swap.

use super::{MemoryIndex, RetrievedChunk, VectorIndex};
use crate::chunking::{Chunk, TextSplitter};
use crate::embedding::Embedder;
use crate::error::{Result, VidsageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, instrument};

/// Registry of per-video indexes.
pub struct IndexRegistry {
    splitter: TextSplitter,
    indexes: RwLock<HashMap<String, Arc<dyn VectorIndex>>>,
    ingest_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexRegistry {
    /// Create an empty registry that chunks transcripts with `splitter`.
    pub fn new(splitter: TextSplitter) -> Self {
        Self {
            splitter,
            indexes: RwLock::new(HashMap::new()),
            ingest_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Chunk, embed, and index `text`, replacing any existing index for
    /// `video_id`. Returns the number of chunks indexed.
    ///
    /// On any failure the previous index (if there was one) is left in place.
    #[instrument(skip(self, text, embedder), fields(video_id = %video_id, chars = text.len()))]
    pub fn ingest(&self, video_id: &str, text: &str, embedder: &dyn Embedder) -> Result<usize> {
        let lock = self.ingest_lock(video_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let chunks: Vec<Chunk> = self.splitter.split(text)?.collect();
        if chunks.is_empty() {
            return Err(VidsageError::EmptyInput);
        }
        info!("Indexing {} chunks for video {}", chunks.len(), video_id);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        let index = MemoryIndex::build(chunks, vectors)?;
        let count = index.len();

        self.insert(video_id, Arc::new(index));
        debug!("Installed index for {} ({} chunks)", video_id, count);
        Ok(count)
    }

    /// Install a prebuilt index, replacing any existing one.
    pub fn insert(&self, video_id: &str, index: Arc<dyn VectorIndex>) {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(video_id.to_string(), index);
    }

    /// The current index for `video_id`, if any.
    pub fn get(&self, video_id: &str) -> Option<Arc<dyn VectorIndex>> {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(video_id)
            .cloned()
    }

    /// Whether `video_id` has been ingested.
    pub fn contains(&self, video_id: &str) -> bool {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(video_id)
    }

    /// Search the index of `video_id`.
    ///
    /// Fails with `NotIngested` when the video has no index.
    pub fn search(&self, video_id: &str, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let index = self
            .get(video_id)
            .ok_or_else(|| VidsageError::NotIngested(video_id.to_string()))?;
        index.search(query, k)
    }

    /// Remove the index of `video_id`. No-op if absent.
    ///
    /// The video's ingest mutex is dropped too unless an ingest holds it.
    pub fn evict(&self, video_id: &str) -> bool {
        let removed = self
            .indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(video_id)
            .is_some();

        let mut locks = self.ingest_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(video_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(video_id);
        }
        drop(locks);

        if removed {
            info!("Evicted index for video {}", video_id);
        }
        removed
    }

    /// Ingested video ids with their chunk counts, sorted by id.
    pub fn list(&self) -> Vec<(String, usize)> {
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let mut videos: Vec<(String, usize)> = indexes
            .iter()
            .map(|(id, index)| (id.clone(), index.len()))
            .collect();
        videos.sort();
        videos
    }

    fn ingest_lock(&self, video_id: &str) -> Arc<Mutex<()>> {
        self.ingest_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(video_id.to_string())
            .or_default()
            .clone()
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new(TextSplitter::default())
    }
}
