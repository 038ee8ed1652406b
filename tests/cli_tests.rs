//! CLI integration tests for Delve
//!
//! Runs the built binary for the init command and the top-level flags.

use delve::utils::toml_config::{ConfigManager, SearchConfig};
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run delve-server with arguments
fn run_delve(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_delve-server"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_delve(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("init"));
    assert!(stdout.contains("ask"));
}

#[test]
fn test_version_command() {
    let output = run_delve(&["--version"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("delve-server"));
}

#[test]
fn test_init_help() {
    let output = run_delve(&["init", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--force"));
    assert!(stdout.contains("--provider"));
    assert!(stdout.contains("--search"));
    assert!(stdout.contains("--port"));
}

// =============================================================================
// Init Command Tests
// =============================================================================

#[test]
fn test_init_scaffolds_project() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_delve(&["--no-color", "init", temp_dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "Init command failed: {:?}", output);

    assert!(temp_dir.path().join("data").is_dir());
    assert!(temp_dir.path().join(".gitignore").exists());

    let content = fs::read_to_string(temp_dir.path().join("delve.toml")).unwrap();
    assert!(content.contains("[pipeline]"));
    assert!(content.contains("[transport]"));
    assert!(content.contains("[providers.ollama]"));
}

#[test]
fn test_init_output_loads_as_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_delve(&["init", temp_dir.path().to_str().unwrap(), "--port", "4100"]);
    assert!(output.status.success());

    let manager = ConfigManager::new(temp_dir.path().join("delve.toml")).unwrap();
    let config = manager.config();
    assert_eq!(config.bind_address(), "127.0.0.1:4100");
    assert!(matches!(config.search, SearchConfig::DuckDuckGo { .. }));
    assert_eq!(config.pipeline.num_queries, 3);
}

#[test]
fn test_init_with_openai_and_serpapi() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_delve(&[
        "init",
        temp_dir.path().to_str().unwrap(),
        "--provider",
        "openai",
        "--search",
        "serpapi",
    ]);
    assert!(output.status.success());

    let env = fs::read_to_string(temp_dir.path().join(".env.example")).unwrap();
    assert!(env.contains("OPENAI_API_KEY"));
    assert!(env.contains("SERPAPI_API_KEY"));
}

#[test]
fn test_init_keeps_existing_config_without_force() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("delve.toml");
    fs::write(&config_path, "# mine\n").unwrap();

    let output = run_delve(&["--no-color", "init", temp_dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("already exists"));
    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");

    let output = run_delve(&["init", "--force", temp_dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert!(fs::read_to_string(&config_path).unwrap().contains("[server]"));
}

#[test]
fn test_no_color_flag() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_delve(&["--no-color", "init", temp_dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert!(
        !String::from_utf8_lossy(&output.stdout).contains("\x1b["),
        "Output should not contain ANSI escape codes when --no-color is used"
    );
}

// =============================================================================
// Missing Config Tests
// =============================================================================

#[test]
fn test_ask_without_config_fails() {
    let output = run_delve(&[
        "--no-color",
        "--config",
        "/nonexistent/path/delve.toml",
        "ask",
        "rust vs go",
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("delve-server init") || stderr.contains("not found"));
}
