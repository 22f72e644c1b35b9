//! Ask command implementation.

use crate::agent::{build_agents, AgentContext};
use crate::cli::preflight::{self, Operation};
use crate::cli::{AgentKind, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(query: &str, kind: AgentKind, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sitewise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let ctx = AgentContext::from_settings(settings)?;

    let spinner = Output::spinner("Loading indexes...");
    let agents = match build_agents(&ctx).await {
        Ok(agents) => agents,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to load agents: {}", e));
            return Err(e.into());
        }
    };

    let agent = match kind {
        AgentKind::Router => agents.router,
        AgentKind::Enviro => agents.enviro,
        AgentKind::Planner => agents.planner,
    };

    spinner.set_message("Agent working...");

    match agent.query(query).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::list_item(&crate::cli::output::content_preview(&call.to_string(), 80));
                }
                println!();
            }

            Output::info(&format!("Completed in {} iteration(s)", response.iterations));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
