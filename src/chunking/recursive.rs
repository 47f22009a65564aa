//! Recursive separator-based text splitter.
//!
//! The text is first broken into spans using the coarsest separator that
//! yields pieces no longer than the window: paragraph breaks, then line
//! breaks, then sentence ends, then whitespace, and finally single
//! characters. Separators stay attached to the piece they end, so the spans
//! tile the input exactly. Spans are then packed greedily into windows, and
//! each new window re-uses trailing spans of the previous one as overlap.

use super::{Chunk, DEFAULT_OVERLAP, DEFAULT_WINDOW_SIZE};
use crate::error::{Result, VidsageError};

/// Separator levels, coarse to fine. Past the last level, text is split into
/// single characters.
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// Character-window splitter with overlap.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    window_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. `overlap` must be smaller than `window_size`.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(VidsageError::Config(
                "window size must be greater than 0".to_string(),
            ));
        }
        if overlap >= window_size {
            return Err(VidsageError::Config(format!(
                "overlap ({}) must be smaller than window size ({})",
                overlap, window_size
            )));
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks.
    ///
    /// Fails with [`VidsageError::EmptyInput`] when the text is empty or
    /// whitespace only. The returned iterator is lazy; calling `split` again
    /// with the same text yields the same chunks.
    pub fn split<'a>(&self, text: &'a str) -> Result<Chunks<'a>> {
        if text.trim().is_empty() {
            return Err(VidsageError::EmptyInput);
        }

        let mut spans = Vec::new();
        collect_spans(text, 0, 0, self.window_size, &mut spans);

        let mut char_start = 0;
        let units = spans
            .into_iter()
            .map(|(start, end)| {
                let chars = text[start..end].chars().count();
                let unit = Unit {
                    start,
                    end,
                    char_start,
                    chars,
                };
                char_start += chars;
                unit
            })
            .collect();

        Ok(Chunks {
            text,
            units,
            window_size: self.window_size,
            overlap: self.overlap,
            next_unit: 0,
            next_id: 0,
        })
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// An indivisible span of the source text.
#[derive(Debug, Clone, Copy)]
struct Unit {
    /// Byte range in the source text.
    start: usize,
    end: usize,
    /// Character offset of `start`.
    char_start: usize,
    /// Length in characters.
    chars: usize,
}

/// Lazy sequence of chunks produced by [`TextSplitter::split`].
pub struct Chunks<'a> {
    text: &'a str,
    units: Vec<Unit>,
    window_size: usize,
    overlap: usize,
    next_unit: usize,
    next_id: usize,
}

impl Chunks<'_> {
    /// Index of the first unit of the window that follows `[start, end)`.
    ///
    /// Walks back from `end` while the carried text stays within the overlap
    /// width, always leaving at least one new unit so the sequence advances.
    fn overlap_start(&self, start: usize, end: usize) -> usize {
        let mut first = end;
        let mut carried = 0;
        while first > start + 1 && carried + self.units[first - 1].chars <= self.overlap {
            first -= 1;
            carried += self.units[first].chars;
        }

        // Leave room for the unit that opens the next window.
        let incoming = self.units[end].chars;
        while first < end && carried + incoming > self.window_size {
            carried -= self.units[first].chars;
            first += 1;
        }
        first
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let total = self.units.len();
        if self.next_unit >= total {
            return None;
        }

        let start = self.next_unit;
        let mut end = start;
        let mut len = 0;
        while end < total && (end == start || len + self.units[end].chars <= self.window_size) {
            len += self.units[end].chars;
            end += 1;
        }

        let first = self.units[start];
        let last = self.units[end - 1];
        let chunk = Chunk {
            id: self.next_id,
            text: self.text[first.start..last.end].to_string(),
            char_span: (first.char_start, last.char_start + last.chars),
        };

        self.next_id += 1;
        self.next_unit = if end >= total {
            total
        } else {
            self.overlap_start(start, end)
        };

        Some(chunk)
    }
}

/// Break `text` (located at byte offset `base` of the source) into spans no
/// longer than `window` characters, trying separator `level` first.
fn collect_spans(text: &str, base: usize, level: usize, window: usize, out: &mut Vec<(usize, usize)>) {
    if text.chars().count() <= window {
        out.push((base, base + text.len()));
        return;
    }

    match SEPARATORS.get(level) {
        Some(separators) => {
            for (start, end) in split_keeping_separators(text, separators) {
                collect_spans(&text[start..end], base + start, level + 1, window, out);
            }
        }
        None => {
            for (i, c) in text.char_indices() {
                out.push((base + i, base + i + c.len_utf8()));
            }
        }
    }
}

/// Split after every occurrence of any separator, keeping the separator on
/// the piece it ends. The pieces tile `text` exactly.
fn split_keeping_separators(text: &str, separators: &[&str]) -> Vec<(usize, usize)> {
    let mut cuts: Vec<usize> = separators
        .iter()
        .flat_map(|sep| text.match_indices(sep).map(|(i, m)| i + m.len()))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start && cut < text.len() {
            pieces.push((start, cut));
            start = cut;
        }
    }
    if start < text.len() {
        pieces.push((start, text.len()));
    }
    pieces
}
