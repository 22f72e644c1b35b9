//! Tool index commands implementation.

use crate::agent::{return_tools_from_index_store, AgentContext, TOOL_INDEX_FILE};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::build_tool_index;
use anyhow::Result;

/// Embed the tool descriptions of a collection and persist them.
pub async fn run_tool_index(index_dir: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let index_dir = Settings::expand_path(index_dir);
    let save_path = index_dir.join(TOOL_INDEX_FILE);
    let ctx = AgentContext::from_settings(settings)?;

    let spinner = Output::spinner("Embedding tool descriptions...");
    let result = build_tool_index(&index_dir, &save_path, &ctx).await;
    spinner.finish_and_clear();

    let count = result?;
    Output::success(&format!("Persisted {} tools to {}", count, save_path.display()));
    Ok(())
}

/// List the tools a collection provides.
pub fn run_tools(index_dir: &str, settings: Settings) -> Result<()> {
    let index_dir = Settings::expand_path(index_dir);
    let ctx = AgentContext::from_settings(settings)?;
    let tools = return_tools_from_index_store(&index_dir, &ctx)?;

    Output::header(&format!("Tools ({})", tools.len()));
    for tool in &tools {
        Output::tool_info(tool.name(), &tool.metadata().description);
    }

    if index_dir.join(TOOL_INDEX_FILE).is_file() {
        Output::kv("Tool index", "persisted");
    } else {
        Output::kv("Tool index", "not built (run 'sitewise tool-index')");
    }
    Ok(())
}
