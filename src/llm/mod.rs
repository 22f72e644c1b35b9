//! Chat model abstraction used by agents and response synthesis.

mod openai;

pub use openai::OpenAIChat;

use crate::error::{Result, SitewiseError};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
};
use async_trait::async_trait;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Provider-assigned call ID, echoed back with the tool result.
    pub id: String,
    /// Name of the requested tool.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// The model's reply to one chat request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl LlmReply {
    /// A plain text reply.
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        }
    }

    /// A reply that only requests tool calls.
    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Send a conversation, offering `tools` for the model to call.
    async fn chat(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<LlmReply>;

    /// Single-turn completion with a system prompt.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| SitewiseError::Llm(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| SitewiseError::Llm(e.to_string()))?
                .into(),
        ];

        let reply = self.chat(&messages, &[]).await?;
        reply
            .content
            .ok_or_else(|| SitewiseError::Llm("Empty response from LLM".to_string()))
    }
}
