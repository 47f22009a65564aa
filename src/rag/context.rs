//! Prompt assembly and source snippets.
//!
//! The prompt has four sections in a fixed order: the system instruction,
//! the retrieved context, the recent history, and the question. Generation
//! backends rely on that layout and on the exact refusal phrase.

use crate::history::ConversationTurn;
use crate::vector_store::RetrievedChunk;

/// Exact reply the model must give when the context is insufficient.
pub const REFUSAL: &str = "I don't know.";

/// Instruction opening every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are VidSage, a helpful assistant that answers questions about a video \
using only the transcript excerpts provided below. Answer only from that context. \
If the context is insufficient to answer, reply with exactly: \"I don't know.\" \
Keep answers concise and factual.";

pub const CONTEXT_HEADER: &str = "CONTEXT:";
pub const HISTORY_HEADER: &str = "HISTORY:";
pub const QUESTION_HEADER: &str = "QUESTION:";
pub const ANSWER_CUE: &str = "Answer:";

/// Ellipsis appended to truncated snippets.
const ELLIPSIS: &str = "...";

/// Assemble the generation prompt.
///
/// Retrieved chunks are joined by a blank line in ranked order; only the last
/// `history_turns` turns are included, oldest first, as `ROLE: text`.
pub fn build_prompt(
    retrieved: &[RetrievedChunk],
    history: &[ConversationTurn],
    question: &str,
    history_turns: usize,
) -> String {
    let context_text = retrieved
        .iter()
        .map(|chunk| chunk.chunk_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let recent = &history[history.len().saturating_sub(history_turns)..];
    let history_text = recent
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{SYSTEM_INSTRUCTION}\n\n{CONTEXT_HEADER}\n{context_text}\n\n{HISTORY_HEADER}\n{history_text}\n\n{QUESTION_HEADER}\n{question}\n\n{ANSWER_CUE}"
    )
}

/// Truncate `text` to `max_chars` characters for display, marking the cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// First `max_chars` characters of `text`, for log lines.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
