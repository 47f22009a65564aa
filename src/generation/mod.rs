//! Answer generation backends.
//!
//! Backends return their results in different envelopes. [`Generation`]
//! names the known shapes and [`extract_answer`] turns any of them into
//! plain text with a fixed fallback order.

mod local;
mod openai;

pub use local::ExtractiveGenerator;
pub use openai::OpenAIGenerator;

use crate::config::{GenerationSettings, ProviderKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A text generation backend.
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    fn generate(&self, prompt: &str) -> Result<Generation>;

    /// Name of the backing provider.
    fn provider(&self) -> &str {
        "custom"
    }
}

/// One candidate inside a nested generations envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: Option<String>,
}

/// Result envelope returned by a [`Generator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generation {
    /// Plain text.
    Text { text: String },
    /// Nested list of candidate lists; the answer is the first candidate of
    /// the first list.
    Generations { generations: Vec<Vec<Candidate>> },
    /// Message with a direct text and/or content field.
    Message {
        text: Option<String>,
        content: Option<String>,
    },
    /// Anything else, kept as raw JSON.
    Raw { value: serde_json::Value },
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Generation::Text { text: text.into() }
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generation::Raw { value } => write!(f, "{}", value),
            other => match serde_json::to_string(other) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => write!(f, "{:?}", other),
            },
        }
    }
}

/// Extract the answer text from a generation result.
///
/// Fallback order: plain string as-is, then the first candidate of the first
/// generations list, then a direct `text` or `content` field, and finally a
/// string rendering of the whole result. Never fails.
pub fn extract_answer(result: &Generation) -> String {
    let extracted = match result {
        Generation::Text { text } => Some(text.clone()),
        Generation::Generations { generations } => generations
            .first()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.text.clone()),
        Generation::Message { text, content } => text.clone().or_else(|| content.clone()),
        Generation::Raw { value } => extract_from_json(value),
    };

    extracted.unwrap_or_else(|| {
        warn!("Unrecognised generation result shape, falling back to its string form");
        result.to_string()
    })
}

fn extract_from_json(value: &serde_json::Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }
    if let Some(generations) = value.get("generations") {
        return generations
            .get(0)
            .and_then(|candidates| candidates.get(0))
            .and_then(|first| first.get("text").and_then(|t| t.as_str()).map(str::to_string));
    }
    ["text", "content"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()).map(str::to_string))
}

/// Create the configured generation backend.
///
/// The OpenAI backend needs a running Tokio runtime.
pub fn create_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    info!("Using {} generation ({})", settings.provider, settings.model);
    match settings.provider {
        ProviderKind::OpenAI => Ok(Arc::new(OpenAIGenerator::with_config(
            &settings.model,
            settings.temperature,
            Duration::from_secs(settings.timeout_secs),
        )?)),
        ProviderKind::Local => Ok(Arc::new(ExtractiveGenerator::new())),
    }
}
