use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "postperm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract post permission matrices from spreadsheets")]
#[command(
    long_about = "postperm reads post/authorization-level workbooks (.xls and .xlsx) and \
                  extracts the permissions granted to each post. Point it at a single \
                  workbook, or at a directory to process every spreadsheet below it."
)]
#[command(after_help = "EXAMPLES:\n  \
    postperm roles/teller.xlsx\n  \
    postperm roles/ --output-format json\n  \
    postperm roles/ --layout positive --exclude archive,tmp --report report.json\n  \
    postperm --generate-config --config postperm.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Workbook or directory to process
    #[arg(required_unless_present = "generate_config")]
    pub path: Option<PathBuf>,

    /// Layout name to apply, or `auto` to detect per workbook
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Directories to exclude from the batch walk
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Maximum directory depth to walk
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Write a JSON report of the batch run to this file
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_layout(self.layout.clone())
            .with_exclude(self.exclude.clone())
            .with_max_depth(self.max_depth)
            .with_report_path(self.report.clone())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Default `tracing` filter for the chosen verbosity; `RUST_LOG` wins.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity_level() {
            _ if self.quiet => "error",
            0 => "warn,postperm=info",
            1 => "info,postperm=debug",
            _ => "debug,postperm=trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_and_flags() {
        let cli = Cli::try_parse_from([
            "postperm",
            "roles",
            "--layout",
            "positive",
            "--exclude",
            "archive,tmp",
            "--output-format",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.path, Some(PathBuf::from("roles")));
        assert_eq!(cli.layout.as_deref(), Some("positive"));
        assert_eq!(
            cli.exclude,
            Some(vec!["archive".to_string(), "tmp".to_string()])
        );
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.verbosity_level(), 2);
        assert_eq!(cli.log_filter(), "debug,postperm=trace");
    }

    #[test]
    fn test_generate_config_does_not_need_path() {
        let cli = Cli::try_parse_from(["postperm", "--generate-config"]).unwrap();
        assert!(cli.generate_config);
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_default_log_filter() {
        let cli = Cli::try_parse_from(["postperm", "roles"]).unwrap();
        assert_eq!(cli.log_filter(), "warn,postperm=info");

        let cli = Cli::try_parse_from(["postperm", "roles", "-v"]).unwrap();
        assert_eq!(cli.log_filter(), "info,postperm=debug");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["postperm", "roles", "-q", "-v"]).is_err());

        let cli = Cli::try_parse_from(["postperm", "roles", "-q"]).unwrap();
        assert_eq!(cli.verbosity_level(), 0);
        assert_eq!(cli.log_filter(), "error");
    }

    #[test]
    fn test_cli_overrides_reach_config() {
        let cli = Cli::try_parse_from([
            "postperm",
            "roles",
            "--layout",
            "colored",
            "--max-depth",
            "3",
            "--report",
            "out/report.json",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());

        assert_eq!(config.extract.layout, "colored");
        assert_eq!(config.scan.max_depth, Some(3));
        assert_eq!(
            config.output.report_path,
            Some(PathBuf::from("out/report.json"))
        );
    }
}
