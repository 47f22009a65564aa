//! YouTube captions via yt-dlp.

use super::TranscriptSource;
use crate::error::{Result, VidsageError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

const CAPTION_FORMAT: &str = "json3";

/// Fetches caption tracks with the `yt-dlp` binary.
///
/// Manual and automatic captions are both accepted. Preferred languages are
/// tried first, then any available track.
#[derive(Debug, Clone)]
pub struct YoutubeTranscripts {
    binary: String,
}

impl YoutubeTranscripts {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    /// Use a specific yt-dlp executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Download caption tracks matching `sub_langs` into `dir`.
    fn download(&self, video_id: &str, sub_langs: &str, dir: &Path) -> Result<Vec<PathBuf>> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let template = dir.join("%(id)s.%(ext)s");

        debug!("Fetching {} captions for {}", sub_langs, video_id);
        let output = Command::new(&self.binary)
            .args([
                "--skip-download",
                "--write-subs",
                "--write-auto-subs",
                "--no-warnings",
                "--sub-format",
                CAPTION_FORMAT,
                "--sub-langs",
                sub_langs,
                "-o",
            ])
            .arg(&template)
            .arg(&url)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidsageError::ToolNotFound(self.binary.clone())
                } else {
                    VidsageError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsageError::Backend(format!("{} failed: {}", self.binary, stderr.trim())));
        }

        let mut tracks: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(CAPTION_FORMAT))
            .collect();
        tracks.sort();
        Ok(tracks)
    }

    fn fetch(&self, video_id: &str, languages: &[String]) -> Result<String> {
        let dir = tempfile::tempdir()?;

        let mut tracks = Vec::new();
        if !languages.is_empty() {
            tracks = self.download(video_id, &languages.join(","), dir.path())?;
        }
        if tracks.is_empty() {
            debug!("No captions in preferred languages for {}, trying any", video_id);
            tracks = self.download(video_id, "all", dir.path())?;
        }

        let track = pick_track(&tracks, languages)
            .ok_or_else(|| VidsageError::Backend("no captions available".to_string()))?;
        info!("Using caption track {}", track.display());

        let raw = std::fs::read_to_string(track)?;
        let text = parse_json3(&raw)?;
        if text.trim().is_empty() {
            return Err(VidsageError::Backend("caption track is empty".to_string()));
        }
        Ok(text)
    }
}

impl Default for YoutubeTranscripts {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSource for YoutubeTranscripts {
    #[instrument(skip(self, languages))]
    fn fetch_transcript(&self, video_id: &str, languages: &[String]) -> Result<String> {
        self.fetch(video_id, languages).map_err(|e| {
            warn!("Transcript fetch failed for {}: {}", video_id, e);
            VidsageError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Pick the first track in preference order, else the first track at all.
///
/// Track files are named `<id>.<lang>.json3`.
fn pick_track<'a>(tracks: &'a [PathBuf], languages: &[String]) -> Option<&'a PathBuf> {
    let lang_of = |path: &Path| {
        path.file_stem()
            .and_then(|stem| Path::new(stem).extension())
            .and_then(|lang| lang.to_str())
            .map(str::to_string)
    };

    languages
        .iter()
        .find_map(|wanted| {
            tracks
                .iter()
                .find(|track| lang_of(track.as_path()).as_deref() == Some(wanted.as_str()))
        })
        .or_else(|| tracks.first())
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Flatten a json3 caption track into plain text.
///
/// Segments of one caption event are concatenated; non-empty events are
/// joined with single spaces.
fn parse_json3(raw: &str) -> Result<String> {
    let track: Json3 = serde_json::from_str(raw)
        .map_err(|e| VidsageError::Backend(format!("invalid caption track: {}", e)))?;

    let lines: Vec<String> = track
        .events
        .iter()
        .map(|event| {
            let line: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            line.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json3() {
        let raw = r#"{
            "events": [
                {"tStartMs": 0, "segs": [{"utf8": "Welcome"}, {"utf8": " to the"}, {"utf8": " lecture"}]},
                {"tStartMs": 1200, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 1500},
                {"tStartMs": 2000, "segs": [{"utf8": "on nuclear\nfusion."}]}
            ]
        }"#;
        assert_eq!(parse_json3(raw).unwrap(), "Welcome to the lecture on nuclear fusion.");
    }

    #[test]
    fn test_parse_json3_rejects_garbage() {
        assert!(parse_json3("<html>").is_err());
        assert_eq!(parse_json3("{}").unwrap(), "");
    }

    #[test]
    fn test_parse_json3_error_is_typed() {
        assert!(matches!(
            parse_json3("not json"),
            Err(VidsageError::Backend(msg)) if msg.starts_with("invalid caption track")
        ));
    }

    #[test]
    fn test_pick_track_prefers_languages_in_order() {
        let tracks = vec![
            PathBuf::from("/tmp/abc.de.json3"),
            PathBuf::from("/tmp/abc.en.json3"),
            PathBuf::from("/tmp/abc.fr.json3"),
        ];
        let langs = vec!["fr".to_string(), "en".to_string()];
        assert_eq!(pick_track(&tracks, &langs), Some(&tracks[2]));

        let none_match = vec!["ja".to_string()];
        assert_eq!(pick_track(&tracks, &none_match), Some(&tracks[0]));
        assert_eq!(pick_track(&[], &langs), None);
    }

    #[test]
    fn test_missing_binary_is_transcript_unavailable() {
        let source = YoutubeTranscripts::with_binary("vidsage-no-such-yt-dlp");
        let err = source
            .fetch_transcript("dQw4w9WgXcQ", &["en".to_string()])
            .unwrap_err();
        match err {
            VidsageError::TranscriptUnavailable { video_id, reason } => {
                assert_eq!(video_id, "dQw4w9WgXcQ");
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
