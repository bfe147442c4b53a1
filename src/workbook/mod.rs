pub mod biff;
pub mod ooxml;

use crate::error::{PostPermError, Result};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadsheetFormat {
    /// BIFF8 compound file (`.xls`)
    Xls,
    /// OOXML zip package (`.xlsx`)
    Xlsx,
}

impl SpreadsheetFormat {
    /// Formats are told apart by suffix only.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "xls" => Some(SpreadsheetFormat::Xls),
            "xlsx" => Some(SpreadsheetFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SpreadsheetFormat::Xls => "xls",
            SpreadsheetFormat::Xlsx => "xlsx",
        }
    }
}

/// Fill foreground of a cell with a visible pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellFill {
    Indexed(u16),
    Rgb(u8, u8, u8),
}

impl CellFill {
    /// Parses `RRGGBB` or OOXML-style `AARRGGBB` (alpha ignored).
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let hex = if hex.len() == 8 { &hex[2..] } else { hex };
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(CellFill::Rgb(r, g, b))
    }
}

/// Failure while reading cell fills from the raw container.
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error("zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub fill: Option<CellFill>,
}

impl Cell {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            fill: None,
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            fill: None,
        }
    }

    pub fn with_fill(mut self, fill: CellFill) -> Self {
        self.fill = Some(fill);
        self
    }

    /// String content of a text cell, if any.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            CellValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Trimmed label text; numbers are rendered without a trailing `.0`.
    pub fn label(&self) -> Option<String> {
        let label = match &self.value {
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(_) | CellValue::Empty => return None,
        };
        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }

    /// Numeric content truncated toward zero. Text is accepted when it
    /// parses as a number.
    pub fn as_integer(&self) -> Option<i64> {
        let number = match &self.value {
            CellValue::Number(n) => *n,
            CellValue::Text(text) => text.trim().parse::<f64>().ok()?,
            CellValue::Bool(_) | CellValue::Empty => return None,
        };
        if number.is_finite() {
            Some(number.trunc() as i64)
        } else {
            None
        }
    }
}

/// Sparse grid of cells keyed by zero-based row, then column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
}

impl Sheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.rows.get(&row)?.get(&column)
    }

    pub fn set_cell(&mut self, row: u32, column: u32, cell: Cell) {
        self.rows.entry(row).or_default().insert(column, cell);
    }

    pub fn set_value(&mut self, row: u32, column: u32, value: CellValue) {
        self.rows
            .entry(row)
            .or_default()
            .entry(column)
            .or_default()
            .value = value;
    }

    pub fn set_fill(&mut self, row: u32, column: u32, fill: CellFill) {
        self.rows
            .entry(row)
            .or_default()
            .entry(column)
            .or_default()
            .fill = Some(fill);
    }

    /// Index of the last row holding any cell.
    pub fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetDocument {
    pub source: PathBuf,
    pub format: SpreadsheetFormat,
    pub sheets: Vec<Sheet>,
}

impl SpreadsheetDocument {
    pub fn new<P: Into<PathBuf>>(source: P, format: SpreadsheetFormat, sheets: Vec<Sheet>) -> Self {
        Self {
            source: source.into(),
            format,
            sheets,
        }
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Reads and parses a workbook. The whole file is held in memory for
    /// the duration of the call; nothing stays open afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let format = SpreadsheetFormat::from_path(path).ok_or_else(|| {
            PostPermError::UnsupportedFormat {
                path: path.display().to_string(),
            }
        })?;

        let bytes = std::fs::read(path).map_err(|source| PostPermError::IoFailure {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_bytes(path, format, bytes)
    }

    pub fn from_bytes(path: &Path, format: SpreadsheetFormat, bytes: Vec<u8>) -> Result<Self> {
        let (mut sheets, fills) = match format {
            SpreadsheetFormat::Xlsx => {
                let workbook = Xlsx::new(Cursor::new(bytes.as_slice()))
                    .map_err(|e| PostPermError::corrupt(path, e))?;
                let sheets = read_sheets::<Cursor<&[u8]>, _>(workbook)
                    .map_err(|e| PostPermError::corrupt(path, e))?;
                let fills =
                    ooxml::read_fills(&bytes).map_err(|e| PostPermError::corrupt(path, e))?;
                (sheets, fills)
            }
            SpreadsheetFormat::Xls => {
                let workbook = Xls::new(Cursor::new(bytes.as_slice()))
                    .map_err(|e| PostPermError::corrupt(path, e))?;
                let sheets = read_sheets::<Cursor<&[u8]>, _>(workbook)
                    .map_err(|e| PostPermError::corrupt(path, e))?;
                let fills =
                    biff::read_fills(&bytes).map_err(|e| PostPermError::corrupt(path, e))?;
                (sheets, fills)
            }
        };

        apply_fills(&mut sheets, fills);

        Ok(Self::new(path, format, sheets))
    }
}

/// Fill colors of one sheet, keyed by (row, column).
pub type SheetFills = HashMap<(u32, u32), CellFill>;

fn apply_fills(sheets: &mut [Sheet], fills: Vec<SheetFills>) {
    for (sheet, sheet_fills) in sheets.iter_mut().zip(fills) {
        for ((row, column), fill) in sheet_fills {
            sheet.set_fill(row, column, fill);
        }
    }
}

fn read_sheets<RS, R>(mut workbook: R) -> std::result::Result<Vec<Sheet>, R::Error>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());

    for (index, name) in names.into_iter().enumerate() {
        let mut sheet = Sheet::new(name);
        // Chart sheets and other non-grid sheets keep their slot, empty.
        if let Some(Ok(range)) = workbook.worksheet_range_at(index) {
            copy_range(&range, &mut sheet);
        }
        sheets.push(sheet);
    }

    Ok(sheets)
}

fn copy_range(range: &Range<Data>, sheet: &mut Sheet) {
    let Some((start_row, start_column)) = range.start() else {
        return;
    };

    for (row, column, data) in range.used_cells() {
        let value = match data {
            Data::Empty => continue,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Float(n) => CellValue::Number(*n),
            Data::Int(n) => CellValue::Number(*n as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            other => CellValue::Text(other.to_string()),
        };
        sheet.set_value(start_row + row as u32, start_column + column as u32, value);
    }
}
