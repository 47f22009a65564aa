//! Configuration module for VidSage.
//!
//! Handles loading and validating application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, HistorySettings,
    ProviderKind, RagSettings, ServerSettings, Settings, TranscriptSettings,
    USE_LOCAL_PROVIDER_ENV,
};
