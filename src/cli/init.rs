//! Init command implementation
//!
//! Scaffolds a Delve project: `delve.toml`, `.env.example`, the data
//! directory and a `.gitignore`.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (delve.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
    /// Web search backend (duckduckgo or serpapi)
    pub search: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Delve");

    let base_path = &config.path;
    let config_path = base_path.join("delve.toml");
    if config_path.exists() && !config.force {
        output.warning("delve.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else if let Err(e) = fs::create_dir_all(&data_dir) {
        output.error(&format!("Failed to create data: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("directory", "data");
    }

    if let Err(e) = write_file(&config_path, &generate_delve_toml(&config), config.force) {
        output.error(&format!("Failed to create delve.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "delve.toml");

    let env_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_path, &generate_env_example(&config), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        match write_file(&gitignore_path, GITIGNORE, false) {
            Ok(()) => output.created("file", ".gitignore"),
            Err(e) => output.warning(&format!("Failed to create .gitignore: {}", e)),
        }
    }

    output.complete("Delve project initialized!");

    output.header("Next Steps");
    if config.provider == "ollama" {
        output.info("Start Ollama (if not running):");
        output.command("ollama serve");
        output.command("ollama pull llama3.2:3b");
    } else {
        output.info("Set your API keys:");
        output.command("cp .env.example .env");
    }
    output.info("Start the server:");
    output.command("delve-server");
    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

const GITIGNORE: &str = "/data\n.env\n";

fn generate_delve_toml(config: &InitConfig) -> String {
    let provider_section = if config.provider == "openai" {
        r#"[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"

[models.default]
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.7"#
    } else {
        r#"[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
default_model = "llama3.2:3b"

[models.default]
provider = "ollama"
model = "llama3.2:3b"
temperature = 0.7"#
    };

    let search_section = if config.search == "serpapi" {
        r#"[search]
provider = "serpapi"
api_key_env = "SERPAPI_API_KEY"
engine = "google"
num_results = 5"#
    } else {
        r#"[search]
provider = "duckduckgo"
num_results = 5"#
    };

    format!(
        r#"# Delve configuration

[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"

[database]
url = "./data/delve.db"
# turso_url_env = "TURSO_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"

{provider_section}

{search_section}

[pipeline]
refiner_model = "default"
summarizer_model = "default"
num_queries = 3
max_organic_results = 5
max_related_questions = 3
request_timeout_secs = 60

[pipeline.retry]
max_attempts = 1
backoff_ms = 500

[transport]
channel_capacity = 256
terminal_retry_attempts = 3
terminal_retry_timeout_ms = 1000
keepalive_secs = 15
"#,
        host = config.host,
        port = config.port,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let mut env = String::from("# Delve environment\nRUST_LOG=info\n");
    if config.provider == "openai" {
        env.push_str("OPENAI_API_KEY=\n");
    }
    if config.search == "serpapi" {
        env.push_str("SERPAPI_API_KEY=\n");
    }
    env
}
