//! RAG answer generation.

use super::context::{build_prompt, preview, snippet};
use crate::embedding::Embedder;
use crate::error::{Result, VidsageError};
use crate::generation::{extract_answer, Generator};
use crate::history::ConversationHistory;
use crate::vector_store::{IndexRegistry, RetrievedChunk};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Characters of the prompt kept in generation failure logs.
const PROMPT_LOG_CHARS: usize = 200;

/// RAG engine answering questions about one ingested video at a time.
///
/// The engine is plain blocking code. Async callers run it through
/// `tokio::task::spawn_blocking` rather than keeping a second implementation.
pub struct RagEngine {
    registry: Arc<IndexRegistry>,
    history: Arc<ConversationHistory>,
    top_k: usize,
    history_turns: usize,
    snippet_chars: usize,
}

impl RagEngine {
    /// Create a new RAG engine over shared registry and history state.
    pub fn new(registry: Arc<IndexRegistry>, history: Arc<ConversationHistory>) -> Self {
        Self {
            registry,
            history,
            top_k: 4,
            history_turns: 6,
            snippet_chars: 400,
        }
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set how many recent history turns go into the prompt.
    pub fn with_history_turns(mut self, history_turns: usize) -> Self {
        self.history_turns = history_turns;
        self
    }

    /// Set the maximum length of returned source snippets.
    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    /// Answer `question` about `video_id` using the history of `session_id`.
    ///
    /// History is only read here. Recording the question and answer is left
    /// to the caller, after this returns successfully.
    #[instrument(skip(self, question, embedder, generator), fields(video_id = %video_id, session_id = %session_id))]
    pub fn answer(
        &self,
        video_id: &str,
        session_id: &str,
        question: &str,
        embedder: &dyn Embedder,
        generator: &dyn Generator,
    ) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let index = self
            .registry
            .get(video_id)
            .ok_or_else(|| VidsageError::NotIngested(video_id.to_string()))?;

        let query = embedder.embed_one(question)?;
        let retrieved = index.search(&query, self.top_k)?;
        debug!("Retrieved {} chunks", retrieved.len());

        let turns = self.history.get(session_id);
        let prompt = build_prompt(&retrieved, &turns, question, self.history_turns);

        let result = generator.generate(&prompt).map_err(|e| {
            error!(
                "Generation failed: {} (prompt: {:?})",
                e,
                preview(&prompt, PROMPT_LOG_CHARS)
            );
            e
        })?;
        let answer = extract_answer(&result);

        let source_snippets = retrieved
            .iter()
            .map(|chunk| snippet(&chunk.chunk_text, self.snippet_chars))
            .collect();

        Ok(RagResponse {
            answer,
            source_snippets,
            sources: retrieved,
        })
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Display snippets of the retrieved chunks, in ranked order.
    pub source_snippets: Vec<String>,
    /// Retrieved chunks with their similarity scores.
    pub sources: Vec<RetrievedChunk>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for (source, text) in self.sources.iter().zip(&self.source_snippets) {
                output.push_str(&format!(
                    "\n[chunk {}] (score: {:.2})\n  {}",
                    source.chunk_id, source.similarity_score, text
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextSplitter;
    use crate::embedding::{EmbeddingAdapter, HashingEmbedder};
    use crate::generation::Generation;
    use crate::history::Role;
    use crate::rag::{CONTEXT_HEADER, QUESTION_HEADER, REFUSAL};
    use std::sync::Mutex;

    /// Records prompts and answers from a fixed keyword rule.
    struct KeywordGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl KeywordGenerator {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Generator for KeywordGenerator {
        fn generate(&self, prompt: &str) -> Result<Generation> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.to_lowercase().contains("fusion") {
                Ok(Generation::text("Yes, fusion came up."))
            } else {
                Ok(Generation::text(REFUSAL))
            }
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> Result<Generation> {
            Err(VidsageError::Backend("model overloaded".to_string()))
        }
    }

    fn setup() -> (RagEngine, Arc<IndexRegistry>, Arc<ConversationHistory>, EmbeddingAdapter) {
        let registry = Arc::new(IndexRegistry::new(TextSplitter::new(60, 10).unwrap()));
        let history = Arc::new(ConversationHistory::default());
        let embedder = EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default()).unwrap();
        let engine = RagEngine::new(registry.clone(), history.clone());
        (engine, registry, history, embedder)
    }

    #[test]
    fn test_answer_uses_retrieved_context() {
        let (engine, registry, _, embedder) = setup();
        registry
            .ingest(
                "v1",
                "The lecture opens with history. Later it covers nuclear fusion in detail. It ends with questions.",
                &embedder,
            )
            .unwrap();

        let generator = KeywordGenerator::new();
        let response = engine
            .answer("v1", "s1", "Was fusion discussed?", &embedder, &generator)
            .unwrap();

        assert_eq!(response.answer, "Yes, fusion came up.");
        assert!(response.source_snippets.iter().any(|s| s.contains("fusion")));
        assert_eq!(response.source_snippets.len(), response.sources.len());
        assert!(response.sources.len() <= 4);

        let prompt = generator.last_prompt();
        assert!(prompt.find(CONTEXT_HEADER).unwrap() < prompt.find(QUESTION_HEADER).unwrap());
    }

    #[test]
    fn test_not_ingested() {
        let (engine, _, _, embedder) = setup();
        let err = engine
            .answer("never", "s1", "Anything?", &embedder, &KeywordGenerator::new())
            .unwrap_err();
        assert!(matches!(err, VidsageError::NotIngested(id) if id == "never"));
    }

    #[test]
    fn test_history_is_read_not_written() {
        let (engine, registry, history, embedder) = setup();
        registry.ingest("v1", "Plasma physics overview.", &embedder).unwrap();
        history.append("s1", Role::User, "What is plasma?");
        history.append("s1", Role::Assistant, "An ionised gas.");

        let generator = KeywordGenerator::new();
        engine
            .answer("v1", "s1", "Tell me more", &embedder, &generator)
            .unwrap();

        assert!(generator.last_prompt().contains("USER: What is plasma?\n\nASSISTANT: An ionised gas."));
        assert_eq!(history.get("s1").len(), 2);
    }

    #[test]
    fn test_generation_failure_propagates() {
        let (engine, registry, history, embedder) = setup();
        registry.ingest("v1", "Some transcript.", &embedder).unwrap();

        let err = engine
            .answer("v1", "s1", "Question?", &embedder, &FailingGenerator)
            .unwrap_err();
        assert!(matches!(err, VidsageError::Backend(_)));
        assert!(history.get("s1").is_empty());
    }

    #[test]
    fn test_long_chunks_are_truncated_in_snippets() {
        let registry = Arc::new(IndexRegistry::default());
        let history = Arc::new(ConversationHistory::default());
        let embedder = EmbeddingAdapter::with_batch_and_query("local", HashingEmbedder::default()).unwrap();
        let engine = RagEngine::new(registry.clone(), history).with_snippet_chars(50);

        registry.ingest("v1", &"fusion ".repeat(100), &embedder).unwrap();
        let response = engine
            .answer("v1", "s1", "fusion?", &embedder, &KeywordGenerator::new())
            .unwrap();

        assert_eq!(response.source_snippets[0].chars().count(), 53);
        assert!(response.source_snippets[0].ends_with("..."));
    }

    #[test]
    fn test_format_for_display() {
        let response = RagResponse {
            answer: "Yes.".to_string(),
            source_snippets: vec!["snippet text".to_string()],
            sources: vec![RetrievedChunk {
                chunk_id: 3,
                chunk_text: "snippet text".to_string(),
                similarity_score: 0.87,
            }],
        };
        let display = response.format_for_display();
        assert!(display.starts_with("Yes."));
        assert!(display.contains("[chunk 3] (score: 0.87)"));
    }
}
