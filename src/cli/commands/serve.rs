//! Serve command implementation.

use crate::agent::{build_agents, AgentContext};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server::{self, AppState};
use std::sync::Arc;

/// Run the HTTP and WebSocket API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sitewise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let files = server::source_files(&settings);
    let download_dir = settings.download_dir();

    let ctx = AgentContext::from_settings(settings)?;

    let spinner = Output::spinner("Loading agents...");
    let agents = build_agents(&ctx).await;
    spinner.finish_and_clear();
    let agents = agents?;

    let state = Arc::new(AppState {
        location_agent: agents.enviro,
        router_agent: agents.router,
        files,
        download_dir,
    });

    let app = server::router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Sitewise API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Location query", "POST /query_location");
    Output::kv("Agent query", "POST /query_agent");
    Output::kv("Download", "GET  /download/{filename}");
    Output::kv("WebSocket", "GET  /ws");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
