//! OpenAI chat completion backend.

use super::{Generation, Generator};
use crate::error::{Result, VidsageError};
use crate::openai::{block_on, create_client_with_timeout, runtime_handle};
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, instrument};

/// Generator backed by the OpenAI chat completions API.
///
/// The assembled prompt already carries the system instruction, so it is
/// sent as a single user message.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    runtime: Handle,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn with_config(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            runtime: runtime_handle()?,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Generation> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(VidsageError::backend)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(VidsageError::backend)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| VidsageError::Backend(format!("Failed to generate response: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone());

        Ok(Generation::Message { text: None, content })
    }
}

impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    fn generate(&self, prompt: &str) -> Result<Generation> {
        let generation = block_on(&self.runtime, self.complete(prompt))?;
        debug!("Received completion");
        Ok(generation)
    }

    fn provider(&self) -> &str {
        "openai"
    }
}
