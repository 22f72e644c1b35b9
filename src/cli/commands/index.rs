//! Index commands implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

fn preflight(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'sitewise doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Build one index per PDF in `dir`.
pub async fn run_index(dir: &str, output: Option<String>, settings: Settings) -> Result<()> {
    preflight(&settings)?;

    let root_dir = Settings::expand_path(dir);
    let save_dir = output
        .map(|o| Settings::expand_path(&o))
        .unwrap_or_else(|| settings.collection_dir(&settings.index.enviro_collection));

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Indexing PDFs in {}", root_dir.display()));
    let progress = Output::progress_bar(0, "Indexing");

    match orchestrator.build_indexes_from_dir(&root_dir, &save_dir, &progress).await {
        Ok(results) => {
            for result in &results {
                Output::list_item(&format!(
                    "{} ({} pages, {} chunks)",
                    result.save_path.display(),
                    result.pages,
                    result.nodes
                ));
            }
            Output::success(&format!(
                "Indexed {} document(s) into {}",
                results.len(),
                save_dir.display()
            ));
        }
        Err(e) => {
            progress.abandon();
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Build one combined index over every PDF in `dir`.
pub async fn run_index_global(dir: &str, output: Option<String>, settings: Settings) -> Result<()> {
    preflight(&settings)?;

    let root_dir = Settings::expand_path(dir);
    let save_path: PathBuf = output
        .map(|o| Settings::expand_path(&o))
        .unwrap_or_else(|| settings.collection_dir(&settings.index.planning_global_collection));

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing all PDFs in {}...", root_dir.display()));
    let result = orchestrator.build_combined_index(&root_dir, &save_path).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!(
                "Indexed {} pages ({} chunks) into {}",
                result.pages,
                result.nodes,
                result.save_path.display()
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            Err(e.into())
        }
    }
}
