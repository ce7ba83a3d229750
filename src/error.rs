use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Spreadsheet could not be read: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,
}

pub type Result<T> = std::result::Result<T, IngestError>;
