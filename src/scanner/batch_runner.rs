use crate::config::ScanConfig;
use crate::error::{PostPermError, Result};
use crate::events::{BatchEvent, EventSink, TracingSink};
use crate::extractor::{Extraction, ExtractionResult, SheetExtractor};
use crate::scanner::file_filter::FileFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Aggregate of one batch run. Every visited entry lands in exactly one of
/// `results`, `empty`, `failed_paths` or `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub results: Vec<ExtractionResult>,
    pub failed_paths: Vec<PathBuf>,
    pub visited: usize,
    pub empty: usize,
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.failed_paths.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_paths.is_empty()
    }

    pub fn is_partitioned(&self) -> bool {
        self.results.len() + self.empty + self.failed_paths.len() + self.skipped == self.visited
    }

    fn record(&mut self, visit: Visit) {
        self.visited += 1;
        match visit {
            Visit::Found(result) => self.results.push(result),
            Visit::Empty => self.empty += 1,
            Visit::Failed(path) => self.failed_paths.push(path),
            Visit::Skipped => self.skipped += 1,
        }
    }
}

/// One item of the walk: a file to look at, or an entry the walk itself
/// could not read.
enum Entry {
    File(PathBuf),
    Error { path: PathBuf, error: PostPermError },
}

enum Visit {
    Found(ExtractionResult),
    Empty,
    Failed(PathBuf),
    Skipped,
}

/// Runs a [`SheetExtractor`] over every spreadsheet below a directory.
pub struct BatchRunner {
    extractor: SheetExtractor,
    filter: FileFilter,
    max_depth: Option<usize>,
    sink: Arc<dyn EventSink>,
}

impl BatchRunner {
    pub fn new(extractor: SheetExtractor, config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            extractor,
            filter: FileFilter::new(config)?,
            max_depth: config.max_depth,
            sink: Arc::new(TracingSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn extractor(&self) -> &SheetExtractor {
        &self.extractor
    }

    /// Walks `root` depth-first in file-name order. Only a missing root is
    /// fatal; per-file failures end up in `failed_paths`.
    pub fn run<P: AsRef<Path>>(&self, root: P) -> Result<BatchOutcome> {
        let root = root.as_ref();

        if !root.exists() {
            return Err(PostPermError::NotFound {
                path: root.display().to_string(),
            });
        }

        self.sink.record(&BatchEvent::Started { root });

        let outcome = self.collect(self.entries(root));

        self.sink.record(&BatchEvent::Finished { outcome: &outcome });
        Ok(outcome)
    }

    fn entries<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = Entry> + 'a {
        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if let Some(max_depth) = self.max_depth {
            walker = walker.max_depth(max_depth);
        }

        walker
            .into_iter()
            .filter_entry(move |entry| {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                entry.depth() == 0
                    || self
                        .filter
                        .should_visit(relative, entry.file_type().is_dir())
            })
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(Entry::File(entry.into_path())),
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    Some(Entry::Error {
                        error: PostPermError::IoFailure {
                            path: path.display().to_string(),
                            source: err.into(),
                        },
                        path,
                    })
                }
            })
    }

    #[cfg(not(feature = "parallel"))]
    fn collect(&self, entries: impl Iterator<Item = Entry>) -> BatchOutcome {
        entries.fold(BatchOutcome::default(), |mut outcome, entry| {
            outcome.record(self.visit(entry));
            outcome
        })
    }

    /// Extracts concurrently; visits are folded back in walk order.
    #[cfg(feature = "parallel")]
    fn collect(&self, entries: impl Iterator<Item = Entry>) -> BatchOutcome {
        use rayon::prelude::*;

        let entries: Vec<Entry> = entries.collect();
        let visits: Vec<Visit> = entries
            .into_par_iter()
            .map(|entry| self.visit(entry))
            .collect();

        visits
            .into_iter()
            .fold(BatchOutcome::default(), |mut outcome, visit| {
                outcome.record(visit);
                outcome
            })
    }

    fn visit(&self, entry: Entry) -> Visit {
        let path = match entry {
            Entry::File(path) => path,
            Entry::Error { path, error } => {
                self.sink.record(&BatchEvent::Failed {
                    path: &path,
                    error: &error,
                });
                return Visit::Failed(path);
            }
        };

        if !self.filter.is_spreadsheet_file(&path) {
            self.sink.record(&BatchEvent::Skipped { path: &path });
            return Visit::Skipped;
        }

        self.sink.record(&BatchEvent::Visiting { path: &path });

        match self.extractor.extract(&path) {
            Ok(Extraction::Found(result)) => {
                self.sink.record(&BatchEvent::Extracted {
                    path: &path,
                    result: &result,
                });
                Visit::Found(result)
            }
            Ok(Extraction::Empty) => {
                self.sink.record(&BatchEvent::Empty { path: &path });
                Visit::Empty
            }
            Err(error) => {
                self.sink.record(&BatchEvent::Failed {
                    path: &path,
                    error: &error,
                });
                Visit::Failed(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::tests::RecordingSink;
    use crate::layout::{LayoutConfig, LayoutSelection};
    use std::fs;
    use tempfile::TempDir;

    fn runner(config: &ScanConfig) -> BatchRunner {
        let extractor = SheetExtractor::new(LayoutConfig::defaults(), LayoutSelection::Auto)
            .unwrap()
            .with_max_file_size(config.max_file_size);
        BatchRunner::new(extractor, config).unwrap()
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let result = runner(&ScanConfig::default()).run(temp_dir.path().join("nope"));
        assert!(matches!(result, Err(PostPermError::NotFound { .. })));
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = runner(&ScanConfig::default()).run(temp_dir.path()).unwrap();
        assert_eq!(outcome, BatchOutcome::default());
        assert!(outcome.is_partitioned());
    }

    #[test]
    fn test_failures_and_skips_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("a.xlsx"), "not a zip").unwrap();
        fs::write(root.join("nested/b.XLS"), "not a compound file").unwrap();
        fs::write(root.join("nested/c.txt"), "text").unwrap();

        let sink = Arc::new(RecordingSink::default());
        let outcome = runner(&ScanConfig::default())
            .with_sink(sink.clone())
            .run(root)
            .unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(
            outcome.failed_paths,
            vec![root.join("a.xlsx"), root.join("nested/b.XLS")]
        );
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.visited, 3);
        assert!(outcome.is_partitioned());
        assert!(outcome.has_failures());

        let kinds = sink.kinds();
        assert_eq!(kinds.first().map(String::as_str), Some("started"));
        assert_eq!(kinds.last().map(String::as_str), Some("finished"));
        assert_eq!(kinds.iter().filter(|k| *k == "failed").count(), 2);
        assert_eq!(kinds.iter().filter(|k| *k == "skipped").count(), 1);
    }

    #[test]
    fn test_excluded_directories_are_not_visited() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("archive/deep")).unwrap();
        fs::write(root.join("archive/old.xlsx"), "x").unwrap();
        fs::write(root.join("archive/deep/older.xlsx"), "x").unwrap();
        fs::write(root.join("keep.txt"), "x").unwrap();

        let config = ScanConfig {
            exclude_dirs: vec!["archive".to_string()],
            ..ScanConfig::default()
        };
        let outcome = runner(&config).run(root).unwrap();

        assert_eq!(outcome.visited, 1);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.failed_paths.is_empty());
    }

    #[test]
    fn test_max_depth_limits_walk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("one/two")).unwrap();
        fs::write(root.join("top.txt"), "x").unwrap();
        fs::write(root.join("one/mid.txt"), "x").unwrap();
        fs::write(root.join("one/two/low.txt"), "x").unwrap();

        let config = ScanConfig {
            max_depth: Some(2),
            ..ScanConfig::default()
        };
        let outcome = runner(&config).run(root).unwrap();
        assert_eq!(outcome.visited, 2);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn test_default_walk_has_no_depth_limit() {
        let temp_dir = TempDir::new().unwrap();
        let mut deep = temp_dir.path().to_path_buf();
        for level in 0..40 {
            deep.push(format!("d{}", level));
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("deep.txt"), "x").unwrap();

        let outcome = runner(&ScanConfig::default()).run(temp_dir.path()).unwrap();
        assert_eq!(outcome.visited, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_patterns_ignore_root_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("backup_roles");
        fs::create_dir_all(root.join("backup")).unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        fs::write(root.join("backup/old.txt"), "x").unwrap();

        let config = ScanConfig {
            exclude_patterns: vec!["backup".to_string()],
            ..ScanConfig::default()
        };
        let outcome = runner(&config).run(&root).unwrap();
        assert_eq!(outcome.visited, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_oversized_file_is_failed() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("big.xlsx"), vec![0u8; 64]).unwrap();

        let config = ScanConfig {
            max_file_size: 16,
            ..ScanConfig::default()
        };
        let outcome = runner(&config).run(temp_dir.path()).unwrap();
        assert_eq!(outcome.failed_paths, vec![temp_dir.path().join("big.xlsx")]);
    }

    #[test]
    fn test_outcome_json_field_names() {
        let outcome = BatchOutcome {
            failed_paths: vec![PathBuf::from("bad.xlsx")],
            visited: 1,
            ..BatchOutcome::default()
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failedPaths"][0], "bad.xlsx");
        assert_eq!(json["results"].as_array().map(Vec::len), Some(0));
    }
}
