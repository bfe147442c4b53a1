use crate::error::{PostPermError, Result};
use crate::extractor::DEFAULT_MAX_FILE_SIZE;
use crate::layout::{LayoutConfig, LayoutSelection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "LayoutConfig::defaults")]
    pub layouts: Vec<LayoutConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub max_file_size: u64,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Layout name, or `auto` to detect per workbook.
    pub layout: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            extract: ExtractConfig::default(),
            output: OutputConfig::default(),
            layouts: LayoutConfig::defaults(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["xls".to_string(), "xlsx".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_dirs: Vec::new(),
            exclude_patterns: Vec::new(),
            max_depth: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            layout: "auto".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PostPermError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PostPermError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| PostPermError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["postperm.toml", ".postperm.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref layout) = cli_args.layout {
            self.extract.layout = layout.clone();
        }

        if let Some(ref exclude) = cli_args.exclude {
            self.scan.exclude_dirs.extend(exclude.clone());
        }

        if let Some(max_depth) = cli_args.max_depth {
            self.scan.max_depth = Some(max_depth);
        }

        if let Some(ref report_path) = cli_args.report_path {
            self.output.report_path = Some(report_path.clone());
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| PostPermError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| PostPermError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.extensions.is_empty() {
            return Err(PostPermError::Config {
                message: "At least one file extension must be specified".to_string(),
            });
        }

        if self.scan.max_file_size == 0 {
            return Err(PostPermError::Config {
                message: "Maximum file size must be greater than 0".to_string(),
            });
        }

        if self.scan.max_depth == Some(0) {
            return Err(PostPermError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.layouts.is_empty() {
            return Err(PostPermError::Config {
                message: "At least one layout must be configured".to_string(),
            });
        }

        let mut names = HashSet::new();
        for layout in &self.layouts {
            layout
                .validate()
                .map_err(|message| PostPermError::Config { message })?;
            if !names.insert(layout.name.as_str()) {
                return Err(PostPermError::Config {
                    message: format!("Duplicate layout name: {}", layout.name),
                });
            }
        }

        if let LayoutSelection::Named(name) = self.layout_selection() {
            if !names.contains(name.as_str()) {
                return Err(PostPermError::UnknownLayout {
                    name,
                    available: self.layout_names(),
                });
            }
        }

        Ok(())
    }

    pub fn layout_selection(&self) -> LayoutSelection {
        LayoutSelection::parse(&self.extract.layout)
    }

    pub fn layout_names(&self) -> Vec<String> {
        self.layouts.iter().map(|l| l.name.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub layout: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub max_depth: Option<usize>,
    pub report_path: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: Option<String>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_exclude(mut self, exclude: Option<Vec<String>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_report_path(mut self, report_path: Option<PathBuf>) -> Self {
        self.report_path = report_path;
        self
    }
}
