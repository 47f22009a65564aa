//! Service orchestrator for VidSage.
//!
//! Wires the transcript source, embedding and generation backends, the index
//! registry, and conversation history behind the exposed operations: ingest
//! a video, answer a question about it, and manage indexes and sessions.
//!
//! The operations are blocking. The `_async` variants run them on Tokio's
//! blocking pool so they can be awaited from request handlers.

use crate::chunking::TextSplitter;
use crate::config::Settings;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, VidsageError};
use crate::generation::{create_generator, Generator};
use crate::history::ConversationHistory;
use crate::rag::{RagEngine, RagResponse};
use crate::transcript::{TranscriptSource, YoutubeTranscripts};
use crate::vector_store::IndexRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// The main orchestrator. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Orchestrator {
    settings: Arc<Settings>,
    transcripts: Arc<dyn TranscriptSource>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    registry: Arc<IndexRegistry>,
    history: Arc<ConversationHistory>,
    engine: Arc<RagEngine>,
}

impl Orchestrator {
    /// Create an orchestrator with the backends named in `settings` and
    /// YouTube captions as the transcript source.
    ///
    /// OpenAI backends capture the current Tokio runtime, so this must be
    /// called from within one.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(create_embedder(&settings.embedding)?);
        let generator = create_generator(&settings.generation)?;
        Self::with_components(settings, Arc::new(YoutubeTranscripts::new()), embedder, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        transcripts: Arc<dyn TranscriptSource>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        settings.validate()?;

        let splitter = TextSplitter::new(settings.chunking.window_size, settings.chunking.overlap)?;
        let registry = Arc::new(IndexRegistry::new(splitter));
        let history = Arc::new(ConversationHistory::new(settings.history.max_turns));
        let engine = Arc::new(
            RagEngine::new(registry.clone(), history.clone())
                .with_top_k(settings.rag.top_k)
                .with_history_turns(settings.rag.history_turns)
                .with_snippet_chars(settings.rag.snippet_chars),
        );

        Ok(Self {
            settings: Arc::new(settings),
            transcripts,
            embedder,
            generator,
            registry,
            history,
            engine,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetch the transcript of `video_id` and (re)build its index.
    #[instrument(skip(self))]
    pub fn ingest(&self, video_id: &str) -> Result<IngestResult> {
        let text = self
            .transcripts
            .fetch_transcript(video_id, &self.settings.transcript.languages)?;
        info!("Fetched transcript for {} ({} chars)", video_id, text.len());

        let chunks = self.registry.ingest(video_id, &text, self.embedder.as_ref())?;
        Ok(IngestResult {
            video_id: video_id.to_string(),
            chunks,
        })
    }

    /// Answer `question` about `video_id` in the context of `session_id`.
    ///
    /// The question and answer are appended to the session history only when
    /// answering succeeds.
    #[instrument(skip(self, question))]
    pub fn query(&self, session_id: &str, video_id: &str, question: &str) -> Result<RagResponse> {
        let response = self.answer(session_id, video_id, question)?;
        self.record_exchange(session_id, question, &response.answer);
        Ok(response)
    }

    /// Run [`Orchestrator::ingest`] on the blocking pool, bounded by `timeout`.
    ///
    /// A timed-out ingest keeps running in the background and may still
    /// replace the index when it finishes.
    pub async fn ingest_async(&self, video_id: &str, timeout: Duration) -> Result<IngestResult> {
        let this = self.clone();
        let id = video_id.to_string();
        let task = tokio::task::spawn_blocking(move || this.ingest(&id));

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| VidsageError::Backend(format!("ingest task failed: {}", e)))?,
            Err(_) => {
                warn!("Ingest of {} exceeded {:?}", video_id, timeout);
                Err(VidsageError::Timeout(format!("ingest of {}", video_id)))
            }
        }
    }

    /// Run [`Orchestrator::query`] on the blocking pool, bounded by `timeout`.
    ///
    /// History is written here, after the answer arrives in time, so a
    /// timed-out query leaves the session untouched even if generation
    /// completes later.
    pub async fn query_async(
        &self,
        session_id: &str,
        video_id: &str,
        question: &str,
        timeout: Duration,
    ) -> Result<RagResponse> {
        let this = self.clone();
        let (session, video, q) = (session_id.to_string(), video_id.to_string(), question.to_string());
        let task = tokio::task::spawn_blocking(move || this.answer(&session, &video, &q));

        let response = match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                joined.map_err(|e| VidsageError::Backend(format!("query task failed: {}", e)))??
            }
            Err(_) => {
                warn!("Query on {} exceeded {:?}", video_id, timeout);
                return Err(VidsageError::Timeout(format!("query on {}", video_id)));
            }
        };

        self.record_exchange(session_id, question, &response.answer);
        Ok(response)
    }

    /// Drop the index of `video_id`. Returns whether one existed.
    pub fn evict(&self, video_id: &str) -> bool {
        self.registry.evict(video_id)
    }

    /// Forget the history of `session_id`.
    pub fn clear_session(&self, session_id: &str) {
        self.history.clear(session_id);
    }

    /// Ingested videos with their chunk counts, sorted by id.
    pub fn indexed_videos(&self) -> Vec<IndexedVideo> {
        self.registry
            .list()
            .into_iter()
            .map(|(video_id, chunks)| IndexedVideo { video_id, chunks })
            .collect()
    }

    /// Name of the embedding backend in use.
    pub fn embedding_provider(&self) -> &str {
        self.embedder.provider()
    }

    /// Name of the generation backend in use.
    pub fn generation_provider(&self) -> &str {
        self.generator.provider()
    }

    /// Whether `video_id` has an index.
    pub fn is_ingested(&self, video_id: &str) -> bool {
        self.registry.contains(video_id)
    }

    fn answer(&self, session_id: &str, video_id: &str, question: &str) -> Result<RagResponse> {
        self.engine.answer(
            video_id,
            session_id,
            question,
            self.embedder.as_ref(),
            self.generator.as_ref(),
        )
    }

    fn record_exchange(&self, session_id: &str, question: &str, answer: &str) {
        self.history.append_exchange(session_id, question, answer);
    }
}

/// Result of ingesting a video.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    /// Video ID.
    pub video_id: String,
    /// Number of chunks indexed.
    pub chunks: usize,
}

/// An ingested video.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedVideo {
    pub video_id: String,
    pub chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingAdapter, HashingEmbedder};
    use crate::generation::Generation;
    use crate::history::Role;
    use crate::rag::REFUSAL;
    use crate::transcript::MemoryTranscripts;

    const FUSION_ANSWER: &str = "Yes — nuclear fusion was mentioned.";

    struct FusionGenerator;

    impl Generator for FusionGenerator {
        fn generate(&self, prompt: &str) -> Result<Generation> {
            if prompt.contains("fusion") {
                Ok(Generation::text(FUSION_ANSWER))
            } else {
                Ok(Generation::text(REFUSAL))
            }
        }
    }

    struct SlowGenerator(Duration);

    impl Generator for SlowGenerator {
        fn generate(&self, _prompt: &str) -> Result<Generation> {
            std::thread::sleep(self.0);
            Ok(Generation::text("late"))
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> Result<Generation> {
            Err(VidsageError::Backend("generation backend down".to_string()))
        }
    }

    fn orchestrator_with(generator: Arc<dyn Generator>) -> (Orchestrator, Arc<MemoryTranscripts>) {
        let embedder = EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default()).unwrap();
        orchestrator_with_embedder(Arc::new(embedder), generator)
    }

    fn orchestrator_with_embedder(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> (Orchestrator, Arc<MemoryTranscripts>) {
        let transcripts = Arc::new(MemoryTranscripts::new());
        let orchestrator =
            Orchestrator::with_components(Settings::default(), transcripts.clone(), embedder, generator).unwrap();
        (orchestrator, transcripts)
    }

    #[test]
    fn test_ingest_and_query_end_to_end() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("v1", "This transcript mentions nuclear fusion and experimental reactors.");

        let ingested = orchestrator.ingest("v1").unwrap();
        assert_eq!(ingested.video_id, "v1");
        assert!(ingested.chunks >= 1);

        let response = orchestrator.query("s1", "v1", "Was fusion discussed?").unwrap();
        assert_eq!(response.answer, FUSION_ANSWER);
        assert!(response
            .source_snippets
            .iter()
            .any(|s| !s.is_empty() && s.contains("fusion")));
    }

    #[test]
    fn test_query_before_ingest() {
        let (orchestrator, _) = orchestrator_with(Arc::new(FusionGenerator));
        let err = orchestrator.query("s1", "never-ingested", "hi").unwrap_err();
        assert!(matches!(err, VidsageError::NotIngested(_)));
    }

    #[test]
    fn test_missing_transcript() {
        let (orchestrator, _) = orchestrator_with(Arc::new(FusionGenerator));
        let err = orchestrator.ingest("nope").unwrap_err();
        assert!(matches!(err, VidsageError::TranscriptUnavailable { .. }));
        assert!(!orchestrator.is_ingested("nope"));
    }

    #[test]
    fn test_empty_transcript_keeps_prior_index() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("v1", "Nuclear fusion powers the sun.");
        orchestrator.ingest("v1").unwrap();

        transcripts.insert("v1", "");
        let err = orchestrator.ingest("v1").unwrap_err();
        assert!(matches!(err, VidsageError::EmptyInput));

        let response = orchestrator.query("s1", "v1", "What powers the sun?").unwrap();
        assert!(response.source_snippets[0].contains("Nuclear fusion"));
    }

    #[test]
    fn test_reingest_replaces_content() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("v1", "The talk is about gardening tomatoes.");
        orchestrator.ingest("v1").unwrap();

        transcripts.insert("v1", "The talk is about deep sea volcanoes.");
        orchestrator.ingest("v1").unwrap();

        let response = orchestrator.query("s1", "v1", "What is the talk about?").unwrap();
        assert!(response.source_snippets.iter().all(|s| !s.contains("tomatoes")));
        assert!(response.source_snippets.iter().any(|s| s.contains("volcanoes")));
    }

    #[test]
    fn test_history_recorded_only_on_success() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("v1", "A lecture about fusion.");
        orchestrator.ingest("v1").unwrap();

        orchestrator.query("s1", "v1", "Was fusion covered?").unwrap();
        let turns = orchestrator.history.get("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Was fusion covered?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, FUSION_ANSWER);

        assert!(orchestrator.query("s1", "v2", "Anything?").is_err());
        assert_eq!(orchestrator.history.get("s1").len(), 2);

        orchestrator.clear_session("s1");
        assert!(orchestrator.history.get("s1").is_empty());
    }

    #[test]
    fn test_generation_failure_leaves_history_empty() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FailingGenerator));
        transcripts.insert("v1", "Some words.");
        orchestrator.ingest("v1").unwrap();

        let err = orchestrator.query("s1", "v1", "Question?").unwrap_err();
        assert!(matches!(err, VidsageError::Backend(_)));
        assert!(orchestrator.history.get("s1").is_empty());
    }

    #[test]
    fn test_evict_and_list() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("b", "Second video.");
        transcripts.insert("a", "First video.");
        orchestrator.ingest("b").unwrap();
        orchestrator.ingest("a").unwrap();

        let ids: Vec<String> = orchestrator
            .indexed_videos()
            .into_iter()
            .map(|v| v.video_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(orchestrator.evict("a"));
        assert!(!orchestrator.evict("a"));
        assert!(matches!(
            orchestrator.query("s1", "a", "hi").unwrap_err(),
            VidsageError::NotIngested(_)
        ));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut settings = Settings::default();
        settings.chunking.overlap = settings.chunking.window_size;
        let result = Orchestrator::with_components(
            settings,
            Arc::new(MemoryTranscripts::new()),
            Arc::new(EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default()).unwrap()),
            Arc::new(FusionGenerator),
        );
        assert!(matches!(result, Err(VidsageError::Config(_))));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let (orchestrator, transcripts) = orchestrator_with(Arc::new(FusionGenerator));
        transcripts.insert("v1", "This transcript mentions nuclear fusion.");

        let ingested = orchestrator.ingest_async("v1", Duration::from_secs(5)).await.unwrap();
        assert!(ingested.chunks >= 1);

        let response = orchestrator
            .query_async("s1", "v1", "Was fusion discussed?", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.answer, FUSION_ANSWER);
        assert_eq!(orchestrator.history.get("s1").len(), 2);
    }

    #[tokio::test]
    async fn test_query_timeout_does_not_touch_history() {
        let (orchestrator, transcripts) =
            orchestrator_with(Arc::new(SlowGenerator(Duration::from_millis(300))));
        transcripts.insert("v1", "Anything at all.");
        orchestrator.ingest("v1").unwrap();

        let err = orchestrator
            .query_async("s1", "v1", "Slow?", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, VidsageError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(orchestrator.history.get("s1").is_empty());
    }

    #[tokio::test]
    async fn test_ingest_timeout_leaves_old_or_complete_new_index() {
        let slow = EmbeddingAdapter::from_fn("slow", |_: &str| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(vec![1.0, 0.5])
        })
        .unwrap();
        let (orchestrator, transcripts) = orchestrator_with_embedder(Arc::new(slow), Arc::new(FusionGenerator));

        let old = "The old talk covers gardening.";
        let new = "The new talk covers volcanoes.";
        transcripts.insert("v1", old);
        orchestrator.ingest("v1").unwrap();

        transcripts.insert("v1", new);
        let err = orchestrator
            .ingest_async("v1", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, VidsageError::Timeout(_)));

        let texts = |o: &Orchestrator| -> Vec<String> {
            let index = o.registry.get("v1").unwrap();
            index.chunks().iter().map(|c| c.text.clone()).collect()
        };
        let seen = texts(&orchestrator);
        assert!(seen == vec![old.to_string()] || seen == vec![new.to_string()]);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(texts(&orchestrator), vec![new.to_string()]);
    }

    #[test]
    fn test_reports_injected_providers() {
        let (orchestrator, _) = orchestrator_with(Arc::new(FusionGenerator));
        assert_eq!(orchestrator.embedding_provider(), "local");
        assert_eq!(orchestrator.generation_provider(), "custom");
    }
}
