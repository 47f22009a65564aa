//! Configuration settings for VidSage.

use crate::error::{Result, VidsageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment switch that forces the local fallback providers.
pub const USE_LOCAL_PROVIDER_ENV: &str = "VIDSAGE_USE_LOCAL_PROVIDER";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub chunking: ChunkingSettings,
    pub rag: RagSettings,
    pub history: HistorySettings,
    pub transcript: TranscriptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single query, generation included.
    pub query_timeout_secs: u64,
    /// Upper bound on a single ingest, transcript fetch included.
    pub ingest_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            query_timeout_secs: 120,
            ingest_timeout_secs: 300,
        }
    }
}

/// Backend family used for embeddings or generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI API (default).
    #[default]
    OpenAI,
    /// Offline fallback: hashed bag-of-words embeddings and extractive answers.
    Local,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "local" | "dummy" => Ok(ProviderKind::Local),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Local => write!(f, "local"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions requested from the model.
    pub dimensions: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 60,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: ProviderKind,
    /// LLM model for answer generation.
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

/// Transcript chunking settings, measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub window_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            window_size: 1000,
            overlap: 200,
        }
    }
}

/// Retrieval and prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Number of most recent history turns included in the prompt.
    pub history_turns: usize,
    /// Maximum characters per returned source snippet.
    pub snippet_chars: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            history_turns: 6,
            snippet_chars: 400,
        }
    }
}

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Turns kept per session; older turns are dropped first.
    pub max_turns: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_turns: 12 }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Caption languages to try, in order of preference.
    pub languages: Vec<String>,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(USE_LOCAL_PROVIDER_ENV) {
            if env_flag(&value) {
                self.embedding.provider = ProviderKind::Local;
                self.generation.provider = ProviderKind::Local;
            }
        }

        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.window_size == 0 {
            return Err(VidsageError::Config(
                "chunking.window_size must be greater than 0".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.window_size {
            return Err(VidsageError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.window_size ({})",
                self.chunking.overlap, self.chunking.window_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(VidsageError::Config("rag.top_k must be greater than 0".to_string()));
        }
        if self.history.max_turns == 0 {
            return Err(VidsageError::Config(
                "history.max_turns must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidsageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidsage")
            .join("config.toml")
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
