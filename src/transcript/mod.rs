//! Transcript acquisition.
//!
//! A [`TranscriptSource`] turns a video id into raw transcript text. Every
//! failure is reported as `TranscriptUnavailable`, whatever the cause.

mod youtube;

pub use youtube::YoutubeTranscripts;

use crate::error::{Result, VidsageError};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{OnceLock, PoisonError, RwLock};

/// A source of raw transcript text.
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of `video_id`, preferring tracks in `languages`
    /// (in order).
    fn fetch_transcript(&self, video_id: &str, languages: &[String]) -> Result<String>;
}

/// Transcripts held in memory, keyed by video id.
#[derive(Debug, Default)]
pub struct MemoryTranscripts {
    transcripts: RwLock<HashMap<String, String>>,
}

impl MemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the transcript of `video_id`.
    pub fn insert(&self, video_id: impl Into<String>, text: impl Into<String>) {
        self.transcripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(video_id.into(), text.into());
    }

    /// Register the contents of a local text file as the transcript of `video_id`.
    pub fn insert_file(&self, video_id: impl Into<String>, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.insert(video_id, text);
        Ok(())
    }
}

impl TranscriptSource for MemoryTranscripts {
    fn fetch_transcript(&self, video_id: &str, _languages: &[String]) -> Result<String> {
        self.transcripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(video_id)
            .cloned()
            .ok_or_else(|| VidsageError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "no transcript registered".to_string(),
            })
    }
}

fn video_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("video id pattern is valid")
    })
}

/// Extract the video id from a YouTube URL or bare id.
///
/// Input that matches no known form is returned trimmed but otherwise
/// unchanged, so callers may use arbitrary opaque ids.
pub fn parse_video_id(input: &str) -> String {
    let input = input.trim();
    video_id_regex()
        .captures(input)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id() {
        let cases = [
            ("dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("  dQw4w9WgXcQ \n", "dQw4w9WgXcQ"),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_video_id(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_unknown_ids_pass_through() {
        assert_eq!(parse_video_id("v1"), "v1");
        assert_eq!(parse_video_id("lecture-2024-intro"), "lecture-2024-intro");
    }

    #[test]
    fn test_memory_transcripts() {
        let source = MemoryTranscripts::new();
        source.insert("v1", "hello world");

        assert_eq!(source.fetch_transcript("v1", &[]).unwrap(), "hello world");

        let err = source.fetch_transcript("v2", &[]).unwrap_err();
        assert!(matches!(err, VidsageError::TranscriptUnavailable { ref video_id, .. } if video_id == "v2"));
    }

    #[test]
    fn test_memory_transcripts_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.txt");
        std::fs::write(&path, "from a file").unwrap();

        let source = MemoryTranscripts::new();
        source.insert_file("talk", &path).unwrap();
        assert_eq!(source.fetch_transcript("talk", &[]).unwrap(), "from a file");

        assert!(source.insert_file("missing", &dir.path().join("nope.txt")).is_err());
    }
}
