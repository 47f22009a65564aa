//! RAG (Retrieval-Augmented Generation) for answering questions about a video.

pub mod context;
mod response;

pub use context::{
    build_prompt, snippet, ANSWER_CUE, CONTEXT_HEADER, HISTORY_HEADER, QUESTION_HEADER, REFUSAL,
    SYSTEM_INSTRUCTION,
};
pub use response::{RagEngine, RagResponse};
