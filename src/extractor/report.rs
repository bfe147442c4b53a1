use crate::error::{PostPermError, Result};
use crate::scanner::BatchOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted record of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub layout: String,
    pub summary: BatchSummary,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub visited: usize,
    pub extracted: usize,
    pub empty: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl From<&BatchOutcome> for BatchSummary {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            visited: outcome.visited,
            extracted: outcome.results.len(),
            empty: outcome.empty,
            failed: outcome.failed(),
            skipped: outcome.skipped,
        }
    }
}

impl BatchReport {
    pub fn new<P: Into<PathBuf>>(
        root: P,
        layout: String,
        outcome: BatchOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            root: root.into(),
            generated_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            layout,
            summary: BatchSummary::from(&outcome),
            outcome,
        }
    }
}

/// Writes batch reports as pretty-printed JSON.
pub struct ReportWriter {
    report_path: PathBuf,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(report_path: P) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn save(&self, report: &BatchReport) -> Result<()> {
        if let Some(parent) = self.report_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PostPermError::IoFailure {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        let json_content = serde_json::to_string_pretty(report)?;

        fs::write(&self.report_path, json_content).map_err(|e| PostPermError::IoFailure {
            path: self.report_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    pub fn load(&self) -> Result<BatchReport> {
        let content =
            fs::read_to_string(&self.report_path).map_err(|e| PostPermError::IoFailure {
                path: self.report_path.display().to_string(),
                source: e,
            })?;
        Ok(serde_json::from_str(&content)?)
    }
}
