pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod layout;
pub mod scanner;
pub mod ui;
pub mod workbook;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractConfig, OutputConfig, ScanConfig};
pub use error::{PostPermError, Result, UserFriendlyError};

// Core functionality re-exports
pub use events::{BatchEvent, EventSink, NullSink, TracingSink};
pub use extractor::{
    extract_with_layout, BatchReport, BatchSummary, Extraction, ExtractionResult, ReportWriter,
    SheetExtractor,
};
pub use layout::{ColumnGroup, LayoutConfig, LayoutSelection, MarkerColor, SelectionPolicy};
pub use scanner::{BatchOutcome, BatchRunner, FileFilter};
pub use ui::{OutputFormatter, OutputMode, ProgressManager, ProgressSink};
pub use workbook::{Cell, CellFill, CellValue, Sheet, SpreadsheetDocument, SpreadsheetFormat};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What one invocation produced.
#[derive(Debug)]
pub enum RunOutcome {
    Single {
        path: PathBuf,
        extraction: Extraction,
    },
    Batch(BatchOutcome),
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        match self {
            RunOutcome::Single { .. } => false,
            RunOutcome::Batch(outcome) => outcome.has_failures(),
        }
    }
}

/// Main library interface for postperm
pub struct PostPerm {
    config: Config,
    extractor: SheetExtractor,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl PostPerm {
    /// Create a new instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        config.validate()?;

        let extractor = SheetExtractor::new(config.layouts.clone(), config.layout_selection())?
            .with_max_file_size(config.scan.max_file_size);
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let show_progress = !quiet && output_mode == OutputMode::Human;
        let progress_manager = ProgressManager::new(show_progress);

        Ok(Self {
            config,
            extractor,
            output_formatter,
            progress_manager,
        })
    }

    /// Create an instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(
            config,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Extracts a single workbook, or runs the batch when `path` is a
    /// directory.
    pub fn process<P: AsRef<Path>>(&self, path: P) -> Result<RunOutcome> {
        let path = path.as_ref();

        if path.is_dir() {
            self.run_batch(path).map(RunOutcome::Batch)
        } else {
            let extraction = self.extract_file(path)?;
            Ok(RunOutcome::Single {
                path: path.to_path_buf(),
                extraction,
            })
        }
    }

    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        self.output_formatter
            .start_operation(&format!("Extracting {}", path.display()));

        let extraction = self.extractor.extract(path)?;
        self.output_formatter.print_extraction(path, &extraction);

        Ok(extraction)
    }

    pub fn run_batch(&self, root: &Path) -> Result<BatchOutcome> {
        let start_time = Instant::now();
        self.output_formatter
            .start_operation(&format!("Scanning {}", root.display()));

        let spinner = self.progress_manager.create_spinner("Scanning");
        let runner = BatchRunner::new(self.extractor.clone(), &self.config.scan)?
            .with_sink(Arc::new(ProgressSink::new(spinner)));

        let outcome = runner.run(root)?;
        let duration = start_time.elapsed();
        self.progress_manager.clear();

        if let Some(ref report_path) = self.config.output.report_path {
            let report = BatchReport::new(
                root,
                self.config.layout_selection().to_string(),
                outcome.clone(),
                duration,
            );
            let writer = ReportWriter::new(report_path);
            writer.save(&report)?;
            self.output_formatter
                .info(&format!("Report written to {}", writer.report_path().display()));
        }

        self.output_formatter.print_batch_outcome(&outcome, duration);

        Ok(outcome)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> &SheetExtractor {
        &self.extractor
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &PostPermError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Extracts one workbook with the default layouts and auto-detection.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Extraction> {
    SheetExtractor::new(LayoutConfig::defaults(), LayoutSelection::Auto)?.extract(path)
}

/// Runs a batch with default settings, logging through `tracing`.
pub fn run_batch<P: AsRef<Path>>(root: P) -> Result<BatchOutcome> {
    let config = Config::default();
    let extractor = SheetExtractor::new(config.layouts.clone(), config.layout_selection())?;
    BatchRunner::new(extractor, &config.scan)?.run(root)
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
