//! The completion-call boundary.
//!
//! The orchestrator treats text generation as one opaque, synchronous
//! exchange: a role prompt and the content being responded to go in, the
//! produced turn text comes out. Everything about transport, providers and
//! retries lives behind [`CompletionClient`].

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

/// A client that can produce one turn's text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Performs a single completion exchange. May fail with a transport or
    /// provider error; the caller treats the failure as recoverable and may
    /// retry the turn.
    async fn complete(&self, role_prompt: &str, user_content: &str) -> Result<String>;
}

/// An implementation of [`CompletionClient`] for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration, including key and base URL.
    /// * `model` - Model identifier to use for chat completions.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn complete(&self, role_prompt: &str, user_content: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(role_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_content)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .context("no response choice from model")?
            .message
            .content
            .as_ref()
            .context("no content in model response")?;

        Ok(content.clone())
    }
}
