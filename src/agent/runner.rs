//! Agent runner with tool calling loop.

use super::retriever::ToolRetriever;
use super::tools::Tool;
use crate::error::{Result, SitewiseError};
use crate::llm::{Llm, ToolCallRequest};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, FunctionCall,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where an agent gets its tools from on each query.
enum ToolSource {
    Fixed(Vec<Arc<dyn Tool>>),
    Retrieved(ToolRetriever),
}

/// Function-calling agent over a set of tools.
pub struct Agent {
    llm: Arc<dyn Llm>,
    tools: ToolSource,
    max_iterations: usize,
    system_prompt: Option<String>,
    verbose: bool,
}

impl Agent {
    /// Create an agent that offers every tool on every query.
    pub fn new(llm: Arc<dyn Llm>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self::with_source(llm, ToolSource::Fixed(tools))
    }

    /// Create an agent that offers the tools retrieved for each query.
    pub fn with_retriever(llm: Arc<dyn Llm>, retriever: ToolRetriever) -> Self {
        Self::with_source(llm, ToolSource::Retrieved(retriever))
    }

    fn with_source(llm: Arc<dyn Llm>, tools: ToolSource) -> Self {
        Self {
            llm,
            tools,
            max_iterations: 10,
            system_prompt: None,
            verbose: false,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.trim().to_string());
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Log tool calls and results at info level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Names of the tools this agent can choose from.
    pub fn tool_names(&self) -> Vec<String> {
        let tools = match &self.tools {
            ToolSource::Fixed(tools) => tools.as_slice(),
            ToolSource::Retrieved(retriever) => retriever.tools(),
        };
        tools.iter().map(|t| t.name().to_string()).collect()
    }

    async fn select_tools(&self, task: &str) -> Result<Vec<Arc<dyn Tool>>> {
        match &self.tools {
            ToolSource::Fixed(tools) => Ok(tools.clone()),
            ToolSource::Retrieved(retriever) => retriever.retrieve(task).await,
        }
    }

    /// Run the agent on a user task.
    #[instrument(skip(self))]
    pub async fn query(&self, task: &str) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(prompt) = &self.system_prompt {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.clone())
                    .build()
                    .map_err(|e| SitewiseError::Agent(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(task.to_string())
                .build()
                .map_err(|e| SitewiseError::Agent(e.to_string()))?
                .into(),
        );

        let tools = self.select_tools(task).await?;
        let definitions: Vec<ChatCompletionTool> =
            tools.iter().map(|t| t.metadata().to_openai()).collect();

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(SitewiseError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let reply = self.llm.chat(&messages, &definitions).await?;

            if reply.tool_calls.is_empty() {
                return Ok(AgentResponse {
                    content: reply.content.unwrap_or_default(),
                    tool_calls: tool_calls_made,
                    iterations,
                });
            }

            // Add assistant message with tool calls to history
            let requested: Vec<ChatCompletionMessageToolCall> = reply
                .tool_calls
                .iter()
                .map(|call| ChatCompletionMessageToolCall {
                    id: call.id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect();
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(requested)
                    .build()
                    .map_err(|e| SitewiseError::Agent(e.to_string()))?
                    .into(),
            );

            for call in &reply.tool_calls {
                let record = self.execute_tool_call(&tools, call).await;

                messages.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(&call.id)
                        .content(record.result.clone())
                        .build()
                        .map_err(|e| SitewiseError::Agent(e.to_string()))?
                        .into(),
                );

                tool_calls_made.push(record);
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(
        &self,
        tools: &[Arc<dyn Tool>],
        call: &ToolCallRequest,
    ) -> ToolCallRecord {
        if self.verbose {
            info!("Calling tool: {} with args: {}", call.name, call.arguments);
        } else {
            debug!("Calling tool: {} with args: {}", call.name, call.arguments);
        }

        let result = match tools.iter().find(|t| t.name() == call.name) {
            None => format!("Unknown tool: {}", call.name),
            Some(tool) => match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                Err(e) => format!("Failed to parse tool arguments: {}", e),
                Ok(arguments) => match tool.call(&arguments).await {
                    Ok(output) => output,
                    Err(e) => format!("Tool error: {}", e),
                },
            },
        };

        if self.verbose {
            info!("Got output: {}", result);
        }

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
