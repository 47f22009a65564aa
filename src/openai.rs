//! OpenAI client configuration and blocking bridge.
//!
//! The retrieval engine is written as plain blocking code, while the OpenAI
//! client is async. Backends capture the runtime [`Handle`] when they are
//! created and drive requests to completion with it. They must be called
//! from a blocking thread (e.g. inside `tokio::task::spawn_blocking`), never
//! directly from an async task.

use crate::error::{Result, VidsageError};
use async_openai::{config::OpenAIConfig, Client};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;

/// Create an OpenAI client with a custom request timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VidsageError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Handle of the current Tokio runtime.
pub fn runtime_handle() -> Result<Handle> {
    Handle::try_current().map_err(|_| {
        VidsageError::Config("OpenAI backends must be created inside a Tokio runtime".to_string())
    })
}

/// Drive `future` to completion from a blocking thread.
pub fn block_on<F: Future>(handle: &Handle, future: F) -> F::Output {
    handle.block_on(future)
}
