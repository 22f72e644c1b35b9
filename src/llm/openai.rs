//! OpenAI chat completions backend.

use super::{Llm, LlmReply, ToolCallRequest};
use crate::error::{Result, SitewiseError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionTool, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model served by the OpenAI API.
pub struct OpenAIChat {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChat {
    /// Create a chat backend for the given model.
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature: 0.1,
        })
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Llm for OpenAIChat {
    #[instrument(
        skip_all,
        fields(model = %self.model, messages = messages.len(), tools = tools.len())
    )]
    async fn chat(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<LlmReply> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages.to_vec())
            .temperature(self.temperature);

        // The API rejects an empty tools array
        if !tools.is_empty() {
            builder.tools(tools.to_vec());
        }

        let request = builder
            .build()
            .map_err(|e| SitewiseError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SitewiseError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SitewiseError::Llm("No response from model".to_string()))?;

        let tool_calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        debug!("Model replied with {} tool calls", tool_calls.len());

        Ok(LlmReply {
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_creation() {
        let chat = OpenAIChat::new("gpt-3.5-turbo").unwrap().with_temperature(0.0);
        assert_eq!(chat.model(), "gpt-3.5-turbo");
        assert_eq!(chat.temperature, 0.0);
    }
}
