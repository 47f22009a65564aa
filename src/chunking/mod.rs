//! Transcript chunking for embedding and retrieval.
//!
//! Splits raw transcript text into overlapping, size-bounded windows.

mod recursive;

pub use recursive::{Chunks, TextSplitter};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default maximum window size, in characters.
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Default overlap between adjacent windows, in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// A contiguous slice of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the sequence.
    pub id: usize,
    /// Text content of this chunk.
    pub text: String,
    /// Character offsets `(start, end)` of this chunk in the source text.
    pub char_span: (usize, usize),
}

impl Chunk {
    /// Length of this chunk in characters.
    pub fn char_len(&self) -> usize {
        self.char_span.1 - self.char_span.0
    }
}

/// Split `text` into overlapping windows.
///
/// Shorthand for `TextSplitter::new(window_size, overlap)?.split(text)`.
pub fn split(text: &str, window_size: usize, overlap: usize) -> Result<Chunks<'_>> {
    TextSplitter::new(window_size, overlap)?.split(text)
}
