//! Deterministic test doubles for the embedding, LLM and tool seams.

use crate::agent::{Tool, ToolMetadata};
use crate::embedding::Embedder;
use crate::error::{Result, SitewiseError};
use crate::llm::{Llm, LlmReply, ToolCallRequest};
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionTool};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Embeds text as keyword counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(self
            .vocabulary
            .iter()
            .map(|word| text.matches(word.as_str()).count() as f32)
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Replays scripted replies and records every request.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<LlmReply>>,
    fallback: Option<String>,
    requests: Mutex<Vec<String>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLlm {
    /// Replies with `replies` in order, then fails.
    pub fn new(replies: Vec<LlmReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the same text to every request.
    pub fn answering(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// JSON of the messages sent with each request.
    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Names of the tools offered with each request.
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn chat(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<LlmReply> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_string(messages).unwrap_or_default());
        self.offered_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.function.name.clone()).collect());

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        match &self.fallback {
            Some(text) => Ok(LlmReply::text(text)),
            None => Err(SitewiseError::Llm("Script exhausted".to_string())),
        }
    }
}

/// Build a tool call request.
pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// A tool that answers with a fixed string and records its arguments.
pub struct StaticTool {
    metadata: ToolMetadata,
    output: String,
    calls: Mutex<Vec<serde_json::Value>>,
}

impl StaticTool {
    pub fn new(name: &str, description: &str, output: &str) -> Self {
        Self {
            metadata: ToolMetadata::new(
                name,
                description,
                serde_json::json!({
                    "type": "object",
                    "properties": { "input": { "type": "string" } },
                    "required": ["input"]
                }),
            ),
            output: output.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, arguments: &serde_json::Value) -> Result<String> {
        self.calls.lock().unwrap().push(arguments.clone());
        Ok(self.output.clone())
    }
}
