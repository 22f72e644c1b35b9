//! Construction of the document agents and the outer routing agent.

use super::retriever::{ToolRetriever, TOOL_INDEX_FILE};
use super::runner::Agent;
use super::tools::{
    build_global_planner_tools, return_tools_from_index_store, AgentTool, Tool, WebSearchTool,
};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::index::Synthesizer;
use crate::llm::{Llm, OpenAIChat};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything needed to build tools and agents.
#[derive(Clone)]
pub struct AgentContext {
    pub settings: Settings,
    pub prompts: Prompts,
    pub llm: Arc<dyn Llm>,
    pub embedder: Arc<dyn Embedder>,
}

impl AgentContext {
    /// Create a context backed by the OpenAI API.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let chat = OpenAIChat::new(&settings.agent.model)?
            .with_temperature(settings.agent.temperature);
        info!("Using chat model {} at temperature {}", chat.model(), settings.agent.temperature);
        let llm = Arc::new(chat);
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);

        Ok(Self {
            settings,
            prompts,
            llm,
            embedder,
        })
    }

    /// A synthesizer configured from the agent settings.
    pub fn synthesizer(&self) -> Arc<Synthesizer> {
        Arc::new(
            Synthesizer::new(self.llm.clone(), self.prompts.clone())
                .with_max_concurrent(self.settings.agent.summary_max_concurrent)
                .with_context_chars(self.settings.agent.summary_context_chars),
        )
    }
}

/// Agent over a collection of document indexes.
///
/// Each query only offers the `retriever_top_k` tools most similar to it. Tool
/// embeddings are read from `<index_dir>/tools.json` when that file exists.
#[instrument(skip(extra_tools, system_prompt, ctx), fields(extra = extra_tools.len()))]
pub async fn pdf_agent(
    index_dir: &Path,
    extra_tools: Vec<Arc<dyn Tool>>,
    system_prompt: &str,
    retriever_top_k: usize,
    ctx: &AgentContext,
) -> Result<Agent> {
    let mut tools = return_tools_from_index_store(index_dir, ctx)?;
    tools.extend(extra_tools);

    let cache = index_dir.join(TOOL_INDEX_FILE);
    let retriever = if cache.is_file() {
        ToolRetriever::load_or_build(tools, ctx.embedder.clone(), retriever_top_k, &cache).await?
    } else {
        ToolRetriever::from_tools(tools, ctx.embedder.clone(), retriever_top_k).await?
    };

    info!(
        "Document agent over {}: {} tools, {} offered per query",
        index_dir.display(),
        retriever.tools().len(),
        retriever.top_k()
    );

    Ok(Agent::with_retriever(ctx.llm.clone(), retriever)
        .with_system_prompt(system_prompt)
        .with_max_iterations(ctx.settings.agent.max_iterations)
        .with_verbose(ctx.settings.agent.verbose))
}

/// The document agents and the routing agent composed from them.
pub struct AgentSet {
    /// Agent over the environmental assessment collection.
    pub enviro: Arc<Agent>,
    /// Agent over the planning application collection.
    pub planner: Arc<Agent>,
    /// Outer agent delegating to the other two.
    pub router: Arc<Agent>,
}

/// Build every agent from the configured collections.
pub async fn build_agents(ctx: &AgentContext) -> Result<AgentSet> {
    let settings = &ctx.settings;
    let top_k = settings.agent.retriever_top_k;

    let enviro = Arc::new(
        pdf_agent(
            &settings.collection_dir(&settings.index.enviro_collection),
            Vec::new(),
            &ctx.prompts.agent.document,
            top_k,
            ctx,
        )
        .await?,
    );

    // The combined planning index is optional
    let global_dir = settings.collection_dir(&settings.index.planning_global_collection);
    let mut planner_extras: Vec<Arc<dyn Tool>> = Vec::new();
    if global_dir.is_dir() {
        let (vector, summary) = build_global_planner_tools(&global_dir, ctx)?;
        planner_extras.push(Arc::new(vector));
        planner_extras.push(Arc::new(summary));
    }

    let planner = Arc::new(
        pdf_agent(
            &settings.collection_dir(&settings.index.planning_collection),
            planner_extras,
            &ctx.prompts.agent.document,
            top_k,
            ctx,
        )
        .await?,
    );

    let mut tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AgentTool::new(
            "enviro_agent",
            "Agent that has information related to the environment.",
            enviro.clone(),
        )),
        Arc::new(AgentTool::new(
            "planner_agent",
            "Agent that has information related to planning.",
            planner.clone(),
        )),
    ];
    if settings.search.enabled {
        tools.push(Arc::new(WebSearchTool::new(settings.search.clone())?));
    }

    let router = Agent::new(ctx.llm.clone(), tools)
        .with_system_prompt(&ctx.prompts.agent.router)
        .with_max_iterations(settings.agent.max_iterations)
        .with_verbose(settings.agent.verbose);
    info!("Built routing agent with tools: {}", router.tool_names().join(", "));

    Ok(AgentSet {
        enviro,
        planner,
        router: Arc::new(router),
    })
}

/// The outer agent routing between the environmental and planning agents.
pub async fn general_agent(ctx: &AgentContext) -> Result<Arc<Agent>> {
    Ok(build_agents(ctx).await?.router)
}
