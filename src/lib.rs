//! VidSage - question answering over video transcripts
//!
//! Ingests a video's transcript, splits it into overlapping windows, embeds
//! them into a per-video index, and answers questions using only the most
//! relevant windows plus the recent turns of the conversation.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `chunking` - Overlapping text windows
//! - `embedding` - Embedding backends and the capability adapter
//! - `vector_store` - Per-video cosine indexes and their registry
//! - `history` - Bounded per-session conversation history
//! - `generation` - Generation backends and answer extraction
//! - `rag` - Prompt assembly and question answering
//! - `transcript` - Transcript acquisition
//! - `orchestrator` - Service coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use vidsage::config::Settings;
//! use vidsage::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     let timeout = std::time::Duration::from_secs(120);
//!
//!     let ingested = orchestrator.ingest_async("dQw4w9WgXcQ", timeout).await?;
//!     println!("Indexed {} chunks", ingested.chunks);
//!
//!     let response = orchestrator
//!         .query_async("session-1", "dQw4w9WgXcQ", "What is the song about?", timeout)
//!         .await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod history;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{Result, VidsageError};
