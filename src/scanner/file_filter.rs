use crate::config::ScanConfig;
use crate::error::{PostPermError, Result};
use regex::Regex;
use std::path::Path;

/// Decides which walk entries are pruned and which files are handed to
/// the extractor.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| PostPermError::Config {
                    message: format!("Invalid exclude pattern '{}': {}", pattern, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_dirs: config
                .exclude_dirs
                .iter()
                .map(|dir| dir.to_lowercase())
                .collect(),
            exclude_patterns,
        })
    }

    /// Case-insensitive extension match.
    pub fn is_spreadsheet_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// False for entries the walk must not descend into or visit. `path` is
    /// relative to the batch root.
    pub fn should_visit(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir {
            if let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) {
                let dir_name_lower = dir_name.to_lowercase();
                if self.exclude_dirs.iter().any(|exclude| *exclude == dir_name_lower) {
                    return false;
                }
            }
        }

        !self.matches_any_pattern(&path.to_string_lossy())
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn get_extensions(&self) -> &[String] {
        &self.extensions
    }
}
