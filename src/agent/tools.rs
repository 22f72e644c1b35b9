//! Tool definitions and implementations for the agent system.

use super::builder::AgentContext;
use super::runner::Agent;
use crate::config::SearchSettings;
use crate::embedding::Embedder;
use crate::error::{Result, SitewiseError};
use crate::index::{list_index_dirs, load_index_pair, SummaryIndex, Synthesizer, VectorIndex};
use crate::vector_store::PageFilter;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Tool names are limited to 64 characters by the chat API.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Name, description and JSON schema of a tool as shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolMetadata {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Metadata for tools taking a single free-text `input` argument.
    pub fn with_input(name: &str, description: &str) -> Self {
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "A full, self-contained question or request"
                    }
                },
                "required": ["input"]
            }),
        )
    }

    /// Convert into an OpenAI function tool definition.
    pub fn to_openai(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.parameters.clone()),
                strict: None,
            },
        }
    }
}

/// A named capability the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    /// Run the tool with JSON arguments produced by the model.
    async fn call(&self, arguments: &Value) -> Result<String>;

    fn name(&self) -> &str {
        &self.metadata().name
    }
}

/// Build a tool name like `vector_tool_report`.
///
/// Spaces are removed, other characters the API rejects become `_`, and the
/// result is cut to 64 characters.
pub fn tool_name(prefix: &str, doc_name: &str) -> String {
    format!("{}_{}", prefix, doc_name)
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TOOL_NAME_LEN)
        .collect()
}

fn string_arg<'a>(arguments: &'a Value, key: &str) -> Result<&'a str> {
    arguments[key]
        .as_str()
        .ok_or_else(|| SitewiseError::Tool(format!("Missing '{}' argument", key)))
}

/// Parse `page_numbers` as a list of page labels; numbers are accepted too.
fn page_filter_arg(arguments: &Value) -> Result<PageFilter> {
    match &arguments["page_numbers"] {
        Value::Null => Ok(PageFilter::all()),
        Value::Array(items) => {
            let pages = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(SitewiseError::Tool(format!("Invalid page number: {}", other))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(PageFilter::pages(pages))
        }
        other => Err(SitewiseError::Tool(format!(
            "'page_numbers' must be a list, got {}",
            other
        ))),
    }
}

/// Answers specific questions from the chunks most similar to the query.
pub struct VectorQueryTool {
    metadata: ToolMetadata,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    synthesizer: Arc<Synthesizer>,
    top_k: usize,
}

impl VectorQueryTool {
    pub fn new(
        name: &str,
        subject: &str,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        synthesizer: Arc<Synthesizer>,
        top_k: usize,
    ) -> Self {
        let description = format!(
            "Use to answer questions over {subject}.\n\
             Useful if you have specific questions over {subject}.\n\
             Always leave page_numbers empty UNLESS there is a specific page \
             you want to search for."
        );
        let parameters = json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The string query to be embedded"
                },
                "page_numbers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Filter by set of pages. Leave empty to search over all pages"
                }
            },
            "required": ["query"]
        });

        Self {
            metadata: ToolMetadata::new(name, &description, parameters),
            index,
            embedder,
            synthesizer,
            top_k,
        }
    }
}

#[async_trait]
impl Tool for VectorQueryTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    #[instrument(skip_all, fields(tool = %self.metadata.name))]
    async fn call(&self, arguments: &Value) -> Result<String> {
        let query = string_arg(arguments, "query")?;
        let filter = page_filter_arg(arguments)?;

        let embedding = self.embedder.embed(query).await?;
        let results = self.index.query(&embedding, self.top_k, &filter).await?;
        debug!("Retrieved {} chunks", results.len());

        self.synthesizer.answer(query, &results).await
    }
}

/// Summarizes a whole document against the input.
pub struct SummaryTool {
    metadata: ToolMetadata,
    index: SummaryIndex,
    synthesizer: Arc<Synthesizer>,
}

impl SummaryTool {
    pub fn new(
        name: &str,
        subject: &str,
        index: SummaryIndex,
        synthesizer: Arc<Synthesizer>,
    ) -> Self {
        let description = format!("Useful for summarization questions related to {}", subject);
        Self {
            metadata: ToolMetadata::with_input(name, &description),
            index,
            synthesizer,
        }
    }
}

#[async_trait]
impl Tool for SummaryTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    #[instrument(skip_all, fields(tool = %self.metadata.name, nodes = self.index.len()))]
    async fn call(&self, arguments: &Value) -> Result<String> {
        let input = string_arg(arguments, "input")?;
        self.synthesizer.summarize_nodes(input, self.index.nodes()).await
    }
}

/// Exposes an agent as a tool of another agent.
pub struct AgentTool {
    metadata: ToolMetadata,
    agent: Arc<Agent>,
}

impl AgentTool {
    pub fn new(name: &str, description: &str, agent: Arc<Agent>) -> Self {
        Self {
            metadata: ToolMetadata::with_input(name, description),
            agent,
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let input = string_arg(arguments, "input")?;
        let response = self.agent.query(input).await?;
        Ok(response.content)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    chat_model: ModelRef<'a>,
    embedding_model: ModelRef<'a>,
    optimization_mode: &'a str,
    focus_mode: &'a str,
    query: &'a str,
    history: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct ModelRef<'a> {
    provider: &'a str,
    model: &'a str,
}

/// Answer from a Perplexica-compatible search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    pub message: String,
    #[serde(default)]
    pub sources: Vec<SearchSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSource {
    #[serde(default)]
    pub page_content: String,
    #[serde(default)]
    pub metadata: Value,
}

impl SearchResults {
    /// Render the message followed by a list of source titles and URLs.
    pub fn to_text(&self) -> String {
        let mut text = self.message.clone();
        let sources: Vec<String> = self
            .sources
            .iter()
            .filter_map(|s| {
                let title = s.metadata["title"].as_str();
                let url = s.metadata["url"].as_str();
                match (title, url) {
                    (Some(t), Some(u)) => Some(format!("- {} ({})", t, u)),
                    (None, Some(u)) => Some(format!("- {}", u)),
                    (Some(t), None) => Some(format!("- {}", t)),
                    (None, None) => None,
                }
            })
            .collect();

        if !sources.is_empty() {
            text.push_str("\n\nSources:\n");
            text.push_str(&sources.join("\n"));
        }
        text
    }
}

/// Searches the internet through a local Perplexica instance.
pub struct WebSearchTool {
    metadata: ToolMetadata,
    client: reqwest::Client,
    settings: SearchSettings,
}

impl WebSearchTool {
    pub const NAME: &'static str = "search_internet";

    pub fn new(settings: SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SitewiseError::Config(format!("Failed to create search client: {}", e)))?;

        let parameters = json!({
            "type": "object",
            "properties": {
                "search_query": {
                    "type": "string",
                    "description": "What to search for"
                }
            },
            "required": ["search_query"]
        });

        Ok(Self {
            metadata: ToolMetadata::new(
                Self::NAME,
                "A useful tool to search the internet for species and places \
                 in Nova Scotia, Canada. Use only when the documents do not contain \
                 enough information.",
                parameters,
            ),
            client,
            settings,
        })
    }

    /// Post a query to the search endpoint.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let request = SearchRequest {
            chat_model: ModelRef {
                provider: &self.settings.chat_provider,
                model: &self.settings.chat_model,
            },
            embedding_model: ModelRef {
                provider: &self.settings.embedding_provider,
                model: &self.settings.embedding_model,
            },
            optimization_mode: &self.settings.optimization_mode,
            focus_mode: &self.settings.focus_mode,
            query,
            history: Vec::new(),
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SitewiseError::Search(format!(
                "Search endpoint returned {}",
                response.status()
            )));
        }

        let results: SearchResults = response.json().await?;
        info!("Web search returned {} sources", results.sources.len());
        Ok(results)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let query = string_arg(arguments, "search_query")?;
        Ok(self.search(query).await?.to_text())
    }
}

/// Summary and vector tools for every document index under `root_dir`.
///
/// Directories are visited in sorted order and each contributes
/// `[summary_tool_<doc>, vector_tool_<doc>]`.
#[instrument(skip(ctx))]
pub fn return_tools_from_index_store(
    root_dir: &Path,
    ctx: &AgentContext,
) -> Result<Vec<Arc<dyn Tool>>> {
    let synthesizer = ctx.synthesizer();
    let top_k = ctx.settings.agent.similarity_top_k;
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

    for dir in list_index_dirs(root_dir)? {
        let doc_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (vector, summary) = load_index_pair(&dir)?;

        tools.push(Arc::new(SummaryTool::new(
            &tool_name("summary_tool", &doc_name),
            &doc_name,
            summary,
            synthesizer.clone(),
        )));
        tools.push(Arc::new(VectorQueryTool::new(
            &tool_name("vector_tool", &doc_name),
            "a given document",
            vector,
            ctx.embedder.clone(),
            synthesizer.clone(),
            top_k,
        )));
    }

    info!("Loaded {} tools from {}", tools.len(), root_dir.display());
    Ok(tools)
}

/// Vector and summary tools over the combined planning index at `index_dir`.
pub fn build_global_planner_tools(
    index_dir: &Path,
    ctx: &AgentContext,
) -> Result<(VectorQueryTool, SummaryTool)> {
    let (vector, summary) = load_index_pair(index_dir)?;
    let synthesizer = ctx.synthesizer();

    let vector_tool = VectorQueryTool::new(
        "vector_tool_planner",
        "all planning documents",
        vector,
        ctx.embedder.clone(),
        synthesizer.clone(),
        ctx.settings.agent.similarity_top_k,
    );
    let summary_tool = SummaryTool::new("summary_tool_planner", "planning", summary, synthesizer);

    Ok((vector_tool, summary_tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Prompts, Settings};
    use crate::index::persist_index_pair;
    use crate::testing::{KeywordEmbedder, ScriptedLlm};
    use crate::vector_store::{MemoryVectorStore, Node, VectorStore};

    const VOCABULARY: &[&str] = &["moose", "bat", "turbine", "wetland"];

    fn context(llm: Arc<ScriptedLlm>) -> AgentContext {
        AgentContext {
            settings: Settings::default(),
            prompts: Prompts::default(),
            llm,
            embedder: Arc::new(KeywordEmbedder::new(VOCABULARY)),
        }
    }

    async fn write_index(dir: &Path, doc: &str) {
        let embedder = KeywordEmbedder::new(VOCABULARY);
        let texts = [
            ("1", "Moose were seen near the wetland."),
            ("2", "Bat surveys ran all summer."),
        ];

        let mut nodes = Vec::new();
        for (order, (page, text)) in texts.iter().enumerate() {
            let embedding = embedder.embed(text).await.unwrap();
            nodes.push(Node::new(
                doc,
                &format!("{}.pdf", doc),
                page,
                text.to_string(),
                embedding,
                order as i32,
            ));
        }
        persist_index_pair(&dir.join(doc), &nodes).await.unwrap();
    }

    #[test]
    fn test_tool_name() {
        assert_eq!(tool_name("vector_tool", "Wind Farm EA"), "vector_tool_WindFarmEA");
        assert_eq!(tool_name("summary_tool", "site(2).v"), "summary_tool_site_2__v");

        let long = tool_name("vector_tool", &"a".repeat(100));
        assert_eq!(long.len(), 64);
        assert!(long.starts_with("vector_tool_aaa"));
    }

    #[test]
    fn test_metadata_to_openai() {
        let metadata = ToolMetadata::with_input("enviro_agent", "Environment docs");
        let tool = metadata.to_openai();
        assert_eq!(tool.function.name, "enviro_agent");
        assert_eq!(tool.function.description.as_deref(), Some("Environment docs"));
        assert_eq!(tool.function.parameters.unwrap()["required"][0], "input");
    }

    #[test]
    fn test_page_filter_arg() {
        assert!(page_filter_arg(&json!({"query": "q"})).unwrap().is_empty());

        let filter = page_filter_arg(&json!({"page_numbers": ["3", 4]})).unwrap();
        assert_eq!(filter.page_labels(), &["3".to_string(), "4".to_string()]);

        assert!(page_filter_arg(&json!({"page_numbers": "3"})).is_err());
    }

    #[tokio::test]
    async fn test_return_tools_from_index_store() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "beta").await;
        write_index(dir.path(), "alpha").await;

        let ctx = context(Arc::new(ScriptedLlm::answering("ok")));
        let tools = return_tools_from_index_store(dir.path(), &ctx).unwrap();

        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["summary_tool_alpha", "vector_tool_alpha", "summary_tool_beta", "vector_tool_beta"]
        );
        assert_eq!(
            tools[0].metadata().description,
            "Useful for summarization questions related to alpha"
        );
    }

    #[tokio::test]
    async fn test_vector_tool_filters_pages() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "ea").await;

        let llm = Arc::new(ScriptedLlm::answering("Bats were surveyed."));
        let ctx = context(llm.clone());
        let tools = return_tools_from_index_store(dir.path(), &ctx).unwrap();
        let vector_tool = &tools[1];

        let answer = vector_tool
            .call(&json!({"query": "Where were moose seen?", "page_numbers": ["2"]}))
            .await
            .unwrap();

        assert_eq!(answer, "Bats were surveyed.");
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("[ea.pdf p. 2]"));
        assert!(!prompt.contains("p. 1]"));
    }

    #[tokio::test]
    async fn test_vector_tool_keeps_top_k_chunks() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
        let store = MemoryVectorStore::new();
        let texts = ["Turbine noise at night.", "Turbine blade glint.", "Wetland drainage."];
        let mut nodes = Vec::new();
        for (order, text) in texts.iter().enumerate() {
            let embedding = embedder.embed(text).await.unwrap();
            let page = (order + 1).to_string();
            nodes.push(Node::new("ea", "ea.pdf", &page, text.to_string(), embedding, order as i32));
        }
        store.upsert_batch(&nodes).await.unwrap();

        let llm = Arc::new(ScriptedLlm::answering("Noise and glint."));
        let ctx = context(llm.clone());
        let tool = VectorQueryTool::new(
            "vector_tool_ea",
            "ea",
            VectorIndex::from_store(Arc::new(store)),
            embedder,
            ctx.synthesizer(),
            2,
        );

        let answer = tool.call(&json!({"query": "turbine effects"})).await.unwrap();
        assert_eq!(answer, "Noise and glint.");
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Turbine noise"));
        assert!(prompt.contains("Turbine blade"));
        assert!(!prompt.contains("Wetland drainage"));
    }

    #[tokio::test]
    async fn test_summary_tool_requires_input() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "ea").await;

        let llm = Arc::new(ScriptedLlm::answering("A short summary."));
        let ctx = context(llm.clone());
        let tools = return_tools_from_index_store(dir.path(), &ctx).unwrap();

        assert!(tools[0].call(&json!({})).await.is_err());

        let summary = tools[0].call(&json!({"input": "Summarize"})).await.unwrap();
        assert_eq!(summary, "A short summary.");
        assert!(llm.prompts()[0].contains("Moose were seen"));
        assert!(llm.prompts()[0].contains("Bat surveys"));
    }

    #[tokio::test]
    async fn test_global_planner_tools_have_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "global").await;

        let ctx = context(Arc::new(ScriptedLlm::answering("ok")));
        let (vector, summary) =
            build_global_planner_tools(&dir.path().join("global"), &ctx).unwrap();

        assert_eq!(vector.name(), "vector_tool_planner");
        assert_eq!(summary.name(), "summary_tool_planner");
        assert_eq!(
            summary.metadata().description,
            "Useful for summarization questions related to planning"
        );
    }

    #[test]
    fn test_search_results_to_text() {
        let results: SearchResults = serde_json::from_value(json!({
            "message": "Blanding's turtles live in southwest Nova Scotia.",
            "sources": [
                {
                    "pageContent": "...",
                    "metadata": {"title": "Turtles", "url": "https://example.org/t"}
                },
                {"pageContent": "...", "metadata": {}}
            ]
        }))
        .unwrap();

        assert_eq!(
            results.to_text(),
            "Blanding's turtles live in southwest Nova Scotia.\n\n\
             Sources:\n- Turtles (https://example.org/t)"
        );
    }

    #[tokio::test]
    async fn test_search_gives_up_on_silent_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Accept the connection and never answer
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let settings = SearchSettings {
            enabled: true,
            endpoint: format!("http://{}/api/search", addr),
            timeout_secs: 1,
            ..SearchSettings::default()
        };
        let tool = WebSearchTool::new(settings).unwrap();

        let started = std::time::Instant::now();
        let result = tool.call(&json!({"search_query": "moose"})).await;
        assert!(matches!(result, Err(SitewiseError::Http(_))));
        assert!(started.elapsed() < Duration::from_secs(10));

        server.abort();
    }

    #[test]
    fn test_search_request_payload() {
        let settings = SearchSettings::default();
        let request = SearchRequest {
            chat_model: ModelRef {
                provider: &settings.chat_provider,
                model: &settings.chat_model,
            },
            embedding_model: ModelRef {
                provider: &settings.embedding_provider,
                model: &settings.embedding_model,
            },
            optimization_mode: &settings.optimization_mode,
            focus_mode: &settings.focus_mode,
            query: "moose",
            history: Vec::new(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chatModel"]["model"], "gpt-4o-mini");
        assert_eq!(value["embeddingModel"]["model"], "text-embedding-3-large");
        assert_eq!(value["optimizationMode"], "speed");
        assert_eq!(value["focusMode"], "webSearch");
        assert_eq!(value["query"], "moose");
        assert_eq!(value["history"], json!([]));
    }
}
