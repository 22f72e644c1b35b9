//! Doctor command - verify configuration and persisted indexes.

use crate::agent::TOOL_INDEX_FILE;
use crate::cli::Output;
use crate::config::Settings;
use crate::index::list_index_dirs;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
///
/// `config_path` is the file given with `--config`, if any.
pub fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("Sitewise Doctor");
    println!();
    println!("Checking configuration and indexes...\n");

    let mut checks = Vec::new();

    let api = vec![check_openai_api_key(), check_search(settings)];
    print_section("API Configuration", &api);
    checks.extend(api);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let collections = check_collections(settings);
    print_section("Index Collections", &collections);
    checks.extend(collections);

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    let config = vec![check_config_file(&config_path)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Sitewise.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Sitewise is ready to use.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

fn check_search(settings: &Settings) -> CheckResult {
    if !settings.search.enabled {
        return CheckResult::ok("Internet search", "disabled");
    }
    let endpoint = &settings.search.endpoint;
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        CheckResult::ok("Internet search", &settings.search.endpoint)
    } else {
        CheckResult::error(
            "Internet search",
            &format!("invalid endpoint '{}'", settings.search.endpoint),
            "Set search.endpoint to the search API URL, e.g. http://localhost:3001/api/search",
        )
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let download_dir = settings.download_dir();
    if download_dir.is_dir() {
        let files = std::fs::read_dir(&download_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).filter(|e| e.path().is_file()).count())
            .unwrap_or(0);
        results.push(CheckResult::ok(
            "Download directory",
            &format!("{} ({} files)", download_dir.display(), files),
        ));
    } else {
        results.push(CheckResult::warning(
            "Download directory",
            &format!("{} (missing)", download_dir.display()),
            "Downloads will return 404 until source files are placed there",
        ));
    }

    results
}

fn check_collections(settings: &Settings) -> Vec<CheckResult> {
    let index = &settings.index;
    let mut results = vec![
        check_collection(settings, &index.enviro_collection),
        check_collection(settings, &index.planning_collection),
    ];

    let global = settings.collection_dir(&index.planning_global_collection);
    if global.is_dir() {
        results.push(CheckResult::ok(
            &index.planning_global_collection,
            &format!("{} ({})", global.display(), format_size(dir_size(&global))),
        ));
    } else {
        results.push(CheckResult::warning(
            &index.planning_global_collection,
            "not built",
            "Optional. Build with: sitewise index-global <pdf_dir>",
        ));
    }

    results
}

/// Check a per-document collection and its tool index.
fn check_collection(settings: &Settings, collection: &str) -> CheckResult {
    let dir = settings.collection_dir(collection);
    let hint = format!("Build with: sitewise index <pdf_dir> --output {}", dir.display());

    if !dir.is_dir() {
        return CheckResult::error(collection, &format!("{} (missing)", dir.display()), &hint);
    }

    let documents = list_index_dirs(&dir).map(|d| d.len()).unwrap_or(0);
    if documents == 0 {
        return CheckResult::warning(
            collection,
            &format!("{} (no documents)", dir.display()),
            &hint,
        );
    }

    let message = format!("{} documents, {}", documents, format_size(dir_size(&dir)));
    if dir.join(TOOL_INDEX_FILE).is_file() {
        CheckResult::ok(collection, &format!("{}, tool index persisted", message))
    } else {
        CheckResult::warning(
            collection,
            &format!("{}, no tool index", message),
            &format!("Speed up startup with: sitewise tool-index {}", dir.display()),
        )
    }
}

/// Check if the config file in use exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: sitewise config edit")
    }
}

/// Total size of the files under a directory.
fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.index.root_dir = root.to_string_lossy().to_string();
        settings
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_collection_checks() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());

        let missing = check_collection(&settings, "enviro_ns");
        assert_eq!(missing.status, CheckStatus::Error);

        let doc_dir = root.path().join("enviro_ns").join("wind_farm_ea");
        std::fs::create_dir_all(&doc_dir).unwrap();
        std::fs::write(doc_dir.join("marker"), b"abc").unwrap();
        let no_tools = check_collection(&settings, "enviro_ns");
        assert_eq!(no_tools.status, CheckStatus::Warning);
        assert!(no_tools.message.starts_with("1 documents"));

        std::fs::write(root.path().join("enviro_ns").join(TOOL_INDEX_FILE), b"[]").unwrap();
        let ready = check_collection(&settings, "enviro_ns");
        assert_eq!(ready.status, CheckStatus::Ok);
        assert!(ready.message.contains("tool index persisted"));
    }

    #[test]
    fn test_config_file_check_uses_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitewise.toml");

        let missing = check_config_file(&path);
        assert_eq!(missing.status, CheckStatus::Warning);

        std::fs::write(&path, "[agent]\nmodel = \"gpt-4o-mini\"\n").unwrap();
        let found = check_config_file(&path);
        assert_eq!(found.status, CheckStatus::Ok);
        assert_eq!(found.message, path.display().to_string());
    }

    #[test]
    fn test_search_endpoint_check() {
        let mut settings = Settings::default();
        assert_eq!(check_search(&settings).status, CheckStatus::Ok);

        settings.search.enabled = true;
        settings.search.endpoint = "localhost:3001".to_string();
        assert_eq!(check_search(&settings).status, CheckStatus::Error);
    }
}
