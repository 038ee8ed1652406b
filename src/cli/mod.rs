//! CLI module for Delve
//!
//! Provides command-line interface parsing and handling for the delve-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod ask;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Delve - streaming web research server
///
/// Refines a question into search queries, searches the web, and streams a
/// summarized answer to any number of live observers.
#[derive(Parser, Debug)]
#[command(
    name = "delve-server",
    version,
    about = "Delve - streaming web research server",
    long_about = "Refines a question into search queries, searches the web, and streams a\n\
                  summarized answer to any number of live observers.\n\n\
                  Run without arguments to start the server, use 'init' to scaffold a config,\n\
                  or 'ask' to run a single query in the terminal.",
    after_help = "EXAMPLES:\n    \
                  delve-server init                  # Write delve.toml and .env.example\n    \
                  delve-server                       # Start the server (requires delve.toml)\n    \
                  delve-server ask \"rust vs go\"      # Research one question in the terminal\n    \
                  delve-server --config my.toml      # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "delve.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter delve.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,

        /// Web search backend (duckduckgo or serpapi)
        #[arg(long, default_value = "duckduckgo")]
        search: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Research one question and print progress as it happens
    Ask {
        /// The question to research
        query: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_start_server() {
        let cli = Cli::try_parse_from(["delve-server"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("delve.toml"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::try_parse_from(["delve-server", "--no-color", "ask", "rust vs go"]).unwrap();
        assert!(cli.no_color);
        match cli.command {
            Some(Commands::Ask { query }) => assert_eq!(query, "rust vs go"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_init_options() {
        let cli = Cli::try_parse_from([
            "delve-server",
            "init",
            "demo",
            "--provider",
            "openai",
            "--search",
            "serpapi",
            "--port",
            "8080",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Init {
                path,
                provider,
                search,
                port,
                force,
                ..
            }) => {
                assert_eq!(path, PathBuf::from("demo"));
                assert_eq!(provider, "openai");
                assert_eq!(search, "serpapi");
                assert_eq!(port, 8080);
                assert!(!force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
