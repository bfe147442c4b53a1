use crate::workbook::CellFill;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COLORED_LAYOUT: &str = "colored";
pub const POSITIVE_LAYOUT: &str = "positive";

/// One label column followed by an inclusive span of value columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnGroup {
    pub label_column: u32,
    pub first_value_column: u32,
    pub last_value_column: u32,
}

impl ColumnGroup {
    pub fn new(label_column: u32, first_value_column: u32, last_value_column: u32) -> Self {
        Self {
            label_column,
            first_value_column,
            last_value_column,
        }
    }

    pub fn value_columns(&self) -> std::ops::RangeInclusive<u32> {
        self.first_value_column..=self.last_value_column
    }
}

/// Highlight used by the marker policy. A fill matches when either its
/// palette index or its RGB value equals the configured one.
///
/// Theme colors (`fgColor theme="…"` in `.xlsx`) are not resolved, so a red
/// picked from the theme palette never matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarkerColor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,
}

impl MarkerColor {
    /// Palette index 10 is red in the BIFF default palette.
    pub fn red() -> Self {
        Self {
            indexed: Some(10),
            rgb: Some("FF0000".to_string()),
        }
    }

    pub fn matches(&self, fill: &CellFill) -> bool {
        match fill {
            CellFill::Indexed(index) => self.indexed == Some(*index),
            CellFill::Rgb(..) => self.rgb.as_deref().and_then(CellFill::from_hex) == Some(*fill),
        }
    }
}

impl Default for MarkerColor {
    fn default() -> Self {
        Self::red()
    }
}

/// Which value cells of a group contribute to the permission map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Only cells highlighted with the marker color, whatever their sign.
    Marker {
        #[serde(default)]
        color: MarkerColor,
    },
    /// Only strictly positive values; the maximum is reported alongside.
    Positive,
}

impl SelectionPolicy {
    pub fn tracks_maximum(&self) -> bool {
        matches!(self, SelectionPolicy::Positive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayoutConfig {
    pub name: String,
    pub sheet_index: usize,
    pub header_row: u32,
    pub post_column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_column: Option<u32>,
    #[serde(default = "default_delimiters")]
    pub delimiters: Vec<String>,
    #[serde(default = "default_level_qualifier")]
    pub level_qualifier: String,
    pub data_start_row: u32,
    pub groups: Vec<ColumnGroup>,
    pub policy: SelectionPolicy,
}

impl LayoutConfig {
    /// Second sheet, post and level labels, two highlighted column groups.
    pub fn colored() -> Self {
        Self {
            name: COLORED_LAYOUT.to_string(),
            sheet_index: 1,
            header_row: 1,
            post_column: 0,
            level_column: Some(3),
            delimiters: default_delimiters(),
            level_qualifier: default_level_qualifier(),
            data_start_row: 3,
            groups: vec![ColumnGroup::new(2, 3, 6), ColumnGroup::new(9, 10, 13)],
            policy: SelectionPolicy::Marker {
                color: MarkerColor::red(),
            },
        }
    }

    /// First sheet, post label only, one column group of weighted values.
    pub fn positive() -> Self {
        Self {
            name: POSITIVE_LAYOUT.to_string(),
            sheet_index: 0,
            header_row: 1,
            post_column: 0,
            level_column: None,
            delimiters: default_delimiters(),
            level_qualifier: default_level_qualifier(),
            data_start_row: 3,
            groups: vec![ColumnGroup::new(2, 3, 6)],
            policy: SelectionPolicy::Positive,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::colored(), Self::positive()]
    }

    /// Extracts the post identifier from a header label such as `岗位：A1`.
    pub fn parse_post(&self, label: &str) -> Option<String> {
        split_label(label, &self.delimiters)
    }

    /// Extracts the level from a header label such as `应用级别：3级`.
    pub fn parse_level(&self, label: &str) -> Option<String> {
        let value = split_label(label, &self.delimiters)?;
        let value = if self.level_qualifier.is_empty() {
            value
        } else {
            value.replace(self.level_qualifier.as_str(), "")
        };
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("layout name must not be empty".to_string());
        }
        if self.groups.is_empty() {
            return Err(format!("layout '{}' has no column groups", self.name));
        }
        if self.delimiters.iter().all(|d| d.is_empty()) {
            return Err(format!("layout '{}' has no label delimiter", self.name));
        }
        if self.data_start_row <= self.header_row {
            return Err(format!(
                "layout '{}' starts its data rows at or above the header row",
                self.name
            ));
        }
        for group in &self.groups {
            if group.first_value_column > group.last_value_column {
                return Err(format!(
                    "layout '{}' has an inverted value span {}..={}",
                    self.name, group.first_value_column, group.last_value_column
                ));
            }
        }
        Ok(())
    }
}

/// How the extractor picks a layout for a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LayoutSelection {
    /// Try every configured layout in order; first one whose header parses wins.
    #[default]
    Auto,
    Named(String),
}

impl LayoutSelection {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            LayoutSelection::Auto
        } else {
            LayoutSelection::Named(value.to_string())
        }
    }
}

impl fmt::Display for LayoutSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSelection::Auto => write!(f, "auto"),
            LayoutSelection::Named(name) => write!(f, "{}", name),
        }
    }
}

fn default_delimiters() -> Vec<String> {
    vec!["：".to_string(), ":".to_string()]
}

fn default_level_qualifier() -> String {
    "级".to_string()
}

/// Returns the text between the first and second occurrence of the first
/// delimiter present in `label`, with spaces removed.
fn split_label(label: &str, delimiters: &[String]) -> Option<String> {
    let delimiter = delimiters
        .iter()
        .find(|d| !d.is_empty() && label.contains(d.as_str()))?;
    let segment = label.split(delimiter.as_str()).nth(1)?;
    let value: String = segment.chars().filter(|c| *c != ' ').collect();
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
