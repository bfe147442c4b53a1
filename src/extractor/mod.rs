pub mod report;
pub mod sheet_extractor;

pub use report::{BatchReport, BatchSummary, ReportWriter};
pub use sheet_extractor::{
    extract_with_layout, Extraction, ExtractionResult, SheetExtractor, DEFAULT_MAX_FILE_SIZE,
};
