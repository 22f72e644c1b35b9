//! Agent system for answering questions over document collections.
//!
//! Document indexes are wrapped as tools, document agents choose among the
//! tools retrieved for each query, and an outer agent routes between the
//! document agents.

mod builder;
mod retriever;
mod runner;
mod tools;

pub use builder::{build_agents, general_agent, pdf_agent, AgentContext, AgentSet};
pub use retriever::{ToolRetriever, TOOL_INDEX_FILE};
pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{
    build_global_planner_tools, return_tools_from_index_store, tool_name, AgentTool, SearchResults,
    SearchSource, SummaryTool, Tool, ToolMetadata, VectorQueryTool, WebSearchTool,
};
