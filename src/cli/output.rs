//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Delve CLI.

use crate::events::ProgressEvent;
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Delve banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                r#"
   {}
   {}
   {}
   {}
"#,
                " ___  ___ _ __   _____ ".bright_cyan().bold(),
                "|   \\| __| |\\ \\ / / __|".bright_cyan().bold(),
                "| |) | _|| |_\\ V /| _| ".cyan().bold(),
                "|___/|___|____\\_/ |___|".blue().bold(),
            );
            println!(
                "   {} {}\n",
                "Streaming web research".bright_white().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!(
                r#"
 ___  ___ _ __   _____
|   \| __| |\ \ / / __|
| |) | _|| |_\ V /| _|
|___/|___|____\_/ |___|

   Streaming web research v{}
"#,
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print one progress event of a run.
    ///
    /// Summary fragments are written inline as they arrive.
    pub fn progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunCreated { id } => self.kv("run", id),
            ProgressEvent::Status { message } => {
                if self.colored {
                    println!("\n  {} {}", "→".bright_cyan().bold(), message.bright_white());
                } else {
                    println!("\n  [..] {}", message);
                }
            }
            ProgressEvent::QueriesReady { queries } => {
                for query in queries {
                    self.list_item(query);
                }
            }
            ProgressEvent::SearchResult { payload } => {
                let query = payload
                    .get("query")
                    .and_then(|q| q.as_str())
                    .unwrap_or("search");
                let hits = payload
                    .get("organic_results")
                    .and_then(|r| r.as_array())
                    .map_or(0, Vec::len);
                self.list_item(&format!("{} ({} results)", query, hits));
            }
            ProgressEvent::SummaryChunk { text } => {
                print!("{}", text);
                io::stdout().flush().ok();
            }
            ProgressEvent::Complete { .. } => {
                println!();
                self.complete("Research complete");
            }
            ProgressEvent::Error { reason } => {
                println!();
                self.error(reason);
            }
        }
    }
}
