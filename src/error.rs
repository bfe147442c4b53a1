use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostPermError {
    #[error("Path not found: {path}")]
    NotFound { path: String },

    #[error("Unsupported file format: {path} (expected .xls or .xlsx)")]
    UnsupportedFormat { path: String },

    #[error("Corrupt spreadsheet {path}: {message}")]
    CorruptFormat { path: String, message: String },

    #[error("Sheet {index} not found in {path}")]
    SheetNotFound { path: String, index: usize },

    #[error("Missing field '{field}' in {path}")]
    MissingField { path: String, field: &'static str },

    #[error("Failed to read {path}: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown layout: {name}")]
    UnknownLayout { name: String, available: Vec<String> },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl PostPermError {
    pub fn corrupt<P: AsRef<std::path::Path>, M: std::fmt::Display>(path: P, message: M) -> Self {
        PostPermError::CorruptFormat {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PostPermError {
    fn user_message(&self) -> String {
        match self {
            PostPermError::NotFound { path } => {
                format!("Path does not exist: {}", path)
            }
            PostPermError::UnsupportedFormat { path } => {
                format!("Not a spreadsheet file: {}", path)
            }
            PostPermError::CorruptFormat { path, message } => {
                format!("Could not open spreadsheet {}: {}", path, message)
            }
            PostPermError::SheetNotFound { path, index } => {
                format!("Spreadsheet {} has no sheet at index {}", path, index)
            }
            PostPermError::MissingField { path, field } => {
                format!("Could not read '{}' from {}", field, path)
            }
            PostPermError::FileTooLarge { size, max_size } => {
                format!(
                    "File too large: {} (maximum allowed: {})",
                    format_bytes(*size),
                    format_bytes(*max_size)
                )
            }
            PostPermError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            PostPermError::UnknownLayout { name, available } => {
                format!(
                    "Unknown layout '{}' (available: {})",
                    name,
                    available.join(", ")
                )
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PostPermError::NotFound { .. } => Some(
                "Check the path for typos and make sure the file or directory is accessible.".to_string()
            ),
            PostPermError::UnsupportedFormat { .. } => Some(
                "Only .xls and .xlsx workbooks can be processed.".to_string()
            ),
            PostPermError::CorruptFormat { .. } => Some(
                "Re-save the workbook from a spreadsheet application and try again.".to_string()
            ),
            PostPermError::SheetNotFound { .. } | PostPermError::MissingField { .. } => Some(
                "The sheet does not match the selected layout. Try --layout auto or a different layout name.".to_string()
            ),
            PostPermError::FileTooLarge { .. } => Some(
                "Raise [scan] max_file_size in the configuration file.".to_string()
            ),
            PostPermError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            PostPermError::UnknownLayout { .. } => Some(
                "Use --layout auto, or define the layout under [[layouts]] in the configuration file.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for PostPermError {
    fn from(error: toml::de::Error) -> Self {
        PostPermError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for PostPermError {
    fn from(error: serde_json::Error) -> Self {
        PostPermError::Serialization {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostPermError>;

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
