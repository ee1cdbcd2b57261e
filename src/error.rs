use polars::error::PolarsError;
use thiserror::Error;

/// Loading a file failed. The `Display` form is the message shown to the user.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error("Could not parse table: {0}")]
    Polars(#[from] PolarsError),

    #[error("Could not parse workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook contains no sheets")]
    EmptyWorkbook,
}

/// A user action that cannot be carried out with the current state.
/// These are notices, never fatal, and leave the state untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No rows selected")]
    NothingSelected,

    #[error("No data to export")]
    NothingToExport,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Could not write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
