use crate::error::{PostPermError, UserFriendlyError};
use crate::extractor::{Extraction, ExtractionResult};
use crate::scanner::BatchOutcome;
use console::{style, Emoji, Term};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &PostPermError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Prints the outcome of a single-file run. Always shown, even when
    /// quiet: it is the command's result.
    pub fn print_extraction(&self, path: &Path, extraction: &Extraction) {
        match (self.mode, extraction) {
            (OutputMode::Json, Extraction::Found(result)) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
                );
            }
            (OutputMode::Json, Extraction::Empty) => {
                self.print_json_object(&serde_json::json!({
                    "type": "empty",
                    "source": path.display().to_string()
                }));
            }
            (OutputMode::Human, Extraction::Found(result)) => self.print_human_result(result),
            (OutputMode::Plain, Extraction::Found(result)) => print_plain_result(result),
            (_, Extraction::Empty) => {
                self.warning(&format!(
                    "No qualifying permissions in {}",
                    path.display()
                ));
            }
        }
    }

    pub fn print_batch_outcome(&self, outcome: &BatchOutcome, duration: Duration) {
        match self.mode {
            OutputMode::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputMode::Human => self.print_human_batch(outcome, duration),
            OutputMode::Plain => print_plain_batch(outcome, duration),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (CHECKMARK, style(message).green().bold()),
                MessageType::Error => (CROSS, style(message).red().bold()),
                MessageType::Warning => (WARNING, style(message).yellow().bold()),
                MessageType::Info => (INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_result(&self, result: &ExtractionResult) {
        println!("Post:   {}", self.highlight(result.post.clone()));
        if let Some(ref level) = result.level {
            println!("Level:  {}", self.highlight(level.clone()));
        }
        if let Some(max) = result.max_permission_value {
            println!("Max:    {}", self.highlight(max.to_string()));
        }
        println!("Layout: {}", result.layout);

        if result.permissions.is_empty() {
            println!("  (no permissions)");
        } else {
            for (name, value) in result.sorted_permissions() {
                println!("  {:<24} {}", name, value);
            }
        }
    }

    fn print_human_batch(&self, outcome: &BatchOutcome, duration: Duration) {
        if !self.quiet {
            self.print_header("Batch Results");
            for result in &outcome.results {
                println!(
                    "{}  ({} permissions)  {}",
                    self.highlight(result.post.clone()),
                    result.permissions.len(),
                    style(result.source.display()).dim()
                );
            }
        }

        if !outcome.failed_paths.is_empty() {
            eprintln!();
            for path in &outcome.failed_paths {
                self.error(&format!("Failed: {}", path.display()));
            }
        }

        if self.quiet {
            return;
        }

        println!();
        self.print_separator();
        if self.use_colors {
            println!(
                "{} {}",
                style("Batch completed!").green().bold(),
                CHECKMARK
            );
        } else {
            println!("✓ Batch completed!");
        }
        println!();
        println!("  Files visited:   {}", self.highlight(outcome.visited.to_string()));
        println!("  Extracted:       {}", self.highlight(outcome.results.len().to_string()));
        println!("  Empty:           {}", outcome.empty);
        println!("  Failed:          {}", outcome.failed());
        println!("  Skipped:         {}", outcome.skipped);
        println!("  Time taken:      {}", self.highlight(format_duration(duration)));
        self.print_separator();
    }
}

fn print_plain_result(result: &ExtractionResult) {
    println!("POST: {}", result.post);
    if let Some(ref level) = result.level {
        println!("LEVEL: {}", level);
    }
    if let Some(max) = result.max_permission_value {
        println!("MAX: {}", max);
    }
    for (name, value) in result.sorted_permissions() {
        println!("PERMISSION: {}={}", name, value);
    }
}

fn print_plain_batch(outcome: &BatchOutcome, duration: Duration) {
    for result in &outcome.results {
        println!(
            "RESULT: {} {} ({} permissions)",
            result.source.display(),
            result.post,
            result.permissions.len()
        );
    }
    for path in &outcome.failed_paths {
        println!("FAILED: {}", path.display());
    }
    println!(
        "COMPLETED: visited={} extracted={} empty={} failed={} skipped={}",
        outcome.visited,
        outcome.results.len(),
        outcome.empty,
        outcome.failed(),
        outcome.skipped
    );
    println!("Duration: {:?}", duration);
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
