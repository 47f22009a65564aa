//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::orchestrator::Orchestrator;
use crate::transcript::{parse_video_id, MemoryTranscripts};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Run the ask command.
pub async fn run_ask(
    video: &str,
    question: &str,
    transcript_file: Option<&Path>,
    settings: Settings,
) -> Result<()> {
    let (orchestrator, video_id) = load_video(video, transcript_file, settings).await?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let timeout = Duration::from_secs(orchestrator.settings().server.query_timeout_secs);

    let spinner = Output::spinner("Thinking...");
    let result = orchestrator
        .query_async(&session_id, &video_id, question, timeout)
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            Output::answer(&response);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}

/// Build an orchestrator and ingest `video` into it.
///
/// With `transcript_file` the transcript is read from disk; otherwise it is
/// fetched from YouTube. Returns the orchestrator and the parsed video id.
pub(super) async fn load_video(
    video: &str,
    transcript_file: Option<&Path>,
    settings: Settings,
) -> Result<(Orchestrator, String)> {
    let checked = preflight::check(Operation::Ask, &settings).and_then(|_| match transcript_file {
        Some(_) => Ok(()),
        None => preflight::check(Operation::Ingest, &settings),
    });
    if let Err(e) = checked {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let video_id = parse_video_id(video);
    let orchestrator = match transcript_file {
        Some(path) => {
            let transcripts = MemoryTranscripts::new();
            transcripts.insert_file(video_id.as_str(), path)?;
            let embedder = Arc::new(create_embedder(&settings.embedding)?);
            let generator = create_generator(&settings.generation)?;
            Orchestrator::with_components(settings, Arc::new(transcripts), embedder, generator)?
        }
        None => Orchestrator::new(settings)?,
    };

    let timeout = Duration::from_secs(orchestrator.settings().server.ingest_timeout_secs);
    let spinner = Output::spinner(&format!("Indexing transcript of {}...", video_id));
    let result = orchestrator.ingest_async(&video_id, timeout).await;
    spinner.finish_and_clear();

    match result {
        Ok(ingested) => {
            Output::success(&format!(
                "Indexed {} chunks from {}",
                ingested.chunks, ingested.video_id
            ));
            Ok((orchestrator, video_id))
        }
        Err(e) => {
            Output::error(&format!("Could not index {}: {}", video_id, e));
            Err(e.into())
        }
    }
}
