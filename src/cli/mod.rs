//! CLI module for Sitewise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand, ValueEnum};

/// Sitewise - question answering over environmental and planning reports
///
/// Indexes PDF reports, wraps each report as agent tools and answers
/// questions through LLM agents, from the command line or over HTTP.
#[derive(Parser, Debug)]
#[command(name = "sitewise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Build one vector and summary index per PDF in a directory
    Index {
        /// Directory containing PDF files
        dir: String,

        /// Directory to write the indexes to (default: the enviro collection)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Build one combined index over every PDF in a directory
    IndexGlobal {
        /// Directory containing PDF files
        dir: String,

        /// Directory to write the index to (default: the global planning collection)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Build and persist the tool-retrieval index of a collection
    ToolIndex {
        /// Collection directory holding one index per document
        index_dir: String,
    },

    /// List the tools built from a collection
    Tools {
        /// Collection directory holding one index per document
        index_dir: String,
    },

    /// Ask a question and get an answer from an agent
    Ask {
        /// The question to ask
        query: String,

        /// Agent to ask
        #[arg(short, long, value_enum, default_value_t = AgentKind::Router)]
        agent: AgentKind,
    },

    /// Start the HTTP and WebSocket API server
    Serve {
        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Which agent answers a question.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    /// Outer agent routing between the document agents
    Router,
    /// Agent over the environmental assessment reports
    Enviro,
    /// Agent over the planning application documents
    Planner,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_agent() {
        let cli = Cli::parse_from([
            "sitewise",
            "-vv",
            "ask",
            "Where are the turbines?",
            "--agent",
            "planner",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { query, agent } => {
                assert_eq!(query, "Where are the turbines?");
                assert_eq!(agent, AgentKind::Planner);
            }
            other => panic!("Expected Ask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_global() {
        let cli = Cli::parse_from(["sitewise", "index-global", "data/planning", "-o", "out"]);
        match cli.command {
            Commands::IndexGlobal { dir, output } => {
                assert_eq!(dir, "data/planning");
                assert_eq!(output.as_deref(), Some("out"));
            }
            other => panic!("Expected IndexGlobal, got {:?}", other),
        }
    }

    #[test]
    fn test_ask_defaults_to_router() {
        let cli = Cli::parse_from(["sitewise", "ask", "q"]);
        assert!(matches!(cli.command, Commands::Ask { agent: AgentKind::Router, .. }));
    }
}
