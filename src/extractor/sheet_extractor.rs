use crate::error::{PostPermError, Result};
use crate::layout::{LayoutConfig, LayoutSelection, SelectionPolicy};
use crate::workbook::{Cell, Sheet, SpreadsheetDocument, SpreadsheetFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default upper bound on a workbook's size on disk.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Post, level and granted permissions read from one workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub post: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "permissionMap")]
    pub permissions: HashMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_permission_value: Option<i64>,
    pub layout: String,
    pub source: PathBuf,
}

impl ExtractionResult {
    pub fn permission(&self, name: &str) -> Option<i64> {
        self.permissions.get(name).copied()
    }

    /// Permission names in lexical order, for stable rendering.
    pub fn sorted_permissions(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<_> = self
            .permissions
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(ExtractionResult),
    /// The workbook parsed but holds no qualifying permission.
    Empty,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty)
    }

    pub fn into_result(self) -> Option<ExtractionResult> {
        match self {
            Extraction::Found(result) => Some(result),
            Extraction::Empty => None,
        }
    }
}

/// Turns single workbooks into [`ExtractionResult`]s according to the
/// configured layouts. Holds no mutable state, so one extractor can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct SheetExtractor {
    layouts: Vec<LayoutConfig>,
    selection: LayoutSelection,
    max_file_size: u64,
}

impl SheetExtractor {
    pub fn new(layouts: Vec<LayoutConfig>, selection: LayoutSelection) -> Result<Self> {
        if layouts.is_empty() {
            return Err(PostPermError::Config {
                message: "At least one layout must be configured".to_string(),
            });
        }

        if let LayoutSelection::Named(ref name) = selection {
            if !layouts.iter().any(|layout| &layout.name == name) {
                return Err(PostPermError::UnknownLayout {
                    name: name.clone(),
                    available: layouts.iter().map(|l| l.name.clone()).collect(),
                });
            }
        }

        Ok(Self {
            layouts,
            selection,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        })
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn layouts(&self) -> &[LayoutConfig] {
        &self.layouts
    }

    pub fn selection(&self) -> &LayoutSelection {
        &self.selection
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Parses one workbook from disk.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let path = path.as_ref();

        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                return Err(PostPermError::NotFound {
                    path: path.display().to_string(),
                })
            }
        };

        if SpreadsheetFormat::from_path(path).is_none() {
            return Err(PostPermError::UnsupportedFormat {
                path: path.display().to_string(),
            });
        }

        if metadata.len() > self.max_file_size {
            return Err(PostPermError::FileTooLarge {
                size: metadata.len(),
                max_size: self.max_file_size,
            });
        }

        let document = SpreadsheetDocument::load(path)?;
        self.extract_document(&document)
    }

    /// Parses an already loaded workbook.
    pub fn extract_document(&self, document: &SpreadsheetDocument) -> Result<Extraction> {
        match self.selection {
            LayoutSelection::Named(ref name) => {
                let layout = self
                    .layouts
                    .iter()
                    .find(|layout| &layout.name == name)
                    .ok_or_else(|| PostPermError::UnknownLayout {
                        name: name.clone(),
                        available: self.layouts.iter().map(|l| l.name.clone()).collect(),
                    })?;
                extract_with_layout(document, layout)
            }
            LayoutSelection::Auto => {
                let mut failure: Option<PostPermError> = None;

                for layout in &self.layouts {
                    match read_header(document, layout) {
                        Ok((sheet, header)) => return Ok(scan_sheet(document, layout, sheet, header)),
                        Err(error) => {
                            if failure.as_ref().map_or(true, |current| {
                                is_sheet_missing(current) && !is_sheet_missing(&error)
                            }) {
                                failure = Some(error);
                            }
                        }
                    }
                }

                Err(failure.unwrap_or_else(|| PostPermError::Config {
                    message: "At least one layout must be configured".to_string(),
                }))
            }
        }
    }
}

/// Parses `document` with exactly one layout.
pub fn extract_with_layout(
    document: &SpreadsheetDocument,
    layout: &LayoutConfig,
) -> Result<Extraction> {
    let (sheet, header) = read_header(document, layout)?;
    Ok(scan_sheet(document, layout, sheet, header))
}

struct Header {
    post: String,
    level: Option<String>,
}

fn is_sheet_missing(error: &PostPermError) -> bool {
    matches!(error, PostPermError::SheetNotFound { .. })
}

fn read_header<'a>(
    document: &'a SpreadsheetDocument,
    layout: &LayoutConfig,
) -> Result<(&'a Sheet, Header)> {
    let path = || document.source.display().to_string();

    let sheet = document
        .sheet(layout.sheet_index)
        .ok_or_else(|| PostPermError::SheetNotFound {
            path: path(),
            index: layout.sheet_index,
        })?;

    let header_text = |column: u32| {
        sheet
            .cell(layout.header_row, column)
            .and_then(Cell::as_str)
    };

    let post = header_text(layout.post_column)
        .and_then(|label| layout.parse_post(label))
        .ok_or_else(|| PostPermError::MissingField {
            path: path(),
            field: "post",
        })?;

    let level = match layout.level_column {
        Some(column) => Some(
            header_text(column)
                .and_then(|label| layout.parse_level(label))
                .ok_or_else(|| PostPermError::MissingField {
                    path: path(),
                    field: "level",
                })?,
        ),
        None => None,
    };

    Ok((sheet, Header { post, level }))
}

fn scan_sheet(
    document: &SpreadsheetDocument,
    layout: &LayoutConfig,
    sheet: &Sheet,
    header: Header,
) -> Extraction {
    let permissions = collect_permissions(sheet, layout);

    let max_permission_value = if layout.policy.tracks_maximum() {
        match permissions.values().max().copied() {
            Some(max) if max > 0 => Some(max),
            _ => return Extraction::Empty,
        }
    } else {
        None
    };

    Extraction::Found(ExtractionResult {
        post: header.post,
        level: header.level,
        permissions,
        max_permission_value,
        layout: layout.name.clone(),
        source: document.source.clone(),
    })
}

/// Later rows and columns overwrite earlier entries with the same name.
fn collect_permissions(sheet: &Sheet, layout: &LayoutConfig) -> HashMap<String, i64> {
    let mut permissions = HashMap::new();

    let Some(last_row) = sheet.last_row() else {
        return permissions;
    };

    for row in layout.data_start_row..=last_row {
        for group in &layout.groups {
            let Some(name) = sheet
                .cell(row, group.label_column)
                .and_then(Cell::label)
            else {
                continue;
            };

            for column in group.value_columns() {
                if let Some(value) = sheet
                    .cell(row, column)
                    .and_then(|cell| selected_value(&layout.policy, cell))
                {
                    permissions.insert(name.clone(), value);
                }
            }
        }
    }

    permissions
}

fn selected_value(policy: &SelectionPolicy, cell: &Cell) -> Option<i64> {
    let value = cell.as_integer()?;
    match policy {
        SelectionPolicy::Marker { color } => cell
            .fill
            .as_ref()
            .filter(|fill| color.matches(fill))
            .map(|_| value),
        SelectionPolicy::Positive => (value > 0).then_some(value),
    }
}
