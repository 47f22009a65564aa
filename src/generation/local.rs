//! Offline fallback generator.
//!
//! Answers by quoting the context sentences that share a content word with
//! the question, and refuses when none do. Useful for local development
//! without API credentials.

use super::{Generation, Generator};
use crate::embedding::tokens;
use crate::error::Result;
use crate::rag::{ANSWER_CUE, CONTEXT_HEADER, HISTORY_HEADER, QUESTION_HEADER, REFUSAL};
use std::collections::HashSet;

/// Maximum number of sentences quoted in an answer.
const MAX_SENTENCES: usize = 3;

/// Extractive answer generator.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self
    }

    fn answer(prompt: &str) -> String {
        let (context, question) = split_prompt(prompt);

        let wanted: HashSet<String> = tokens(question).collect();
        if wanted.is_empty() {
            return REFUSAL.to_string();
        }

        let quoted: Vec<&str> = sentences(context)
            .filter(|sentence| tokens(sentence).any(|t| wanted.contains(&t)))
            .take(MAX_SENTENCES)
            .collect();

        if quoted.is_empty() {
            REFUSAL.to_string()
        } else {
            quoted.join(" ")
        }
    }
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, prompt: &str) -> Result<Generation> {
        Ok(Generation::text(Self::answer(prompt)))
    }

    fn provider(&self) -> &str {
        "local"
    }
}

/// Context and question of a prompt, trimmed.
///
/// The question and history markers are located from the end of the prompt,
/// so headers quoted inside transcript chunks are treated as context text.
fn split_prompt(prompt: &str) -> (&str, &str) {
    let body = prompt.rfind(ANSWER_CUE).map_or(prompt, |end| &prompt[..end]);
    let Some(at) = body.rfind(QUESTION_HEADER) else {
        return ("", "");
    };
    let question = body[at + QUESTION_HEADER.len()..].trim();

    let head = &body[..at];
    let head = head.rfind(HISTORY_HEADER).map_or(head, |end| &head[..end]);
    let context = head
        .find(CONTEXT_HEADER)
        .map_or("", |start| head[start + CONTEXT_HEADER.len()..].trim());

    (context, question)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '?', '!', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
