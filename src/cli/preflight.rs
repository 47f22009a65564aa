//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available before
//! starting operations that would otherwise fail midway.

use crate::config::{ProviderKind, Settings};
use crate::error::{Result, VidsageError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Fetching a transcript from YouTube and indexing it.
    Ingest,
    /// Answering questions about an already available transcript.
    Ask,
    /// Running the HTTP server, which does both.
    Serve,
}

/// Run pre-flight checks for the given operation under `settings`.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if needs_api_key(operation, settings) {
        check_api_key()?;
    }
    if matches!(operation, Operation::Ingest | Operation::Serve) {
        check_tool("yt-dlp")?;
    }
    Ok(())
}

fn needs_api_key(operation: Operation, settings: &Settings) -> bool {
    let embedding = settings.embedding.provider == ProviderKind::OpenAI;
    let generation = settings.generation.provider == ProviderKind::OpenAI;
    match operation {
        Operation::Ingest => embedding,
        Operation::Ask | Operation::Serve => embedding || generation,
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(VidsageError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(VidsageError::Config(format!(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' \
             (or set {}=1 to use the local providers)",
            crate::config::USE_LOCAL_PROVIDER_ENV
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(VidsageError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidsageError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidsageError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
