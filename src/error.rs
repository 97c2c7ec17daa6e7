use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a conversion or inspection request.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input path does not end in one of the accepted extensions
    #[error("Unsupported extension for '{path}'. Allowed: {allowed:?}")]
    UnsupportedFileType { path: String, allowed: Vec<String> },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No readable files given.")]
    NoReadableInput,

    /// A required logical column could not be resolved against the merged table
    #[error("Required column '{field}' not found. Available columns: {available:?}")]
    MissingRequiredField { field: String, available: Vec<String> },

    #[error("Invalid field mapping: {0}")]
    InvalidMapping(String),

    #[error("custom_ab mode requires a source column and a target column")]
    MissingPairColumns,

    #[error("Unknown graph mode '{0}'. Expected one of: org_event, org_org, custom_ab")]
    UnknownGraphMode(String),

    /// Catch-all reported at the conversion boundary
    #[error("Conversion failed: {kind}: {message}")]
    Conversion { kind: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Short name of the failure class, used when wrapping at the boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedFileType { .. } => "UnsupportedFileType",
            ConvertError::FileNotFound(_) => "FileNotFound",
            ConvertError::NoReadableInput => "NoReadableInput",
            ConvertError::MissingRequiredField { .. } => "MissingRequiredField",
            ConvertError::InvalidMapping(_) => "InvalidMapping",
            ConvertError::MissingPairColumns => "MissingPairColumns",
            ConvertError::UnknownGraphMode(_) => "UnknownGraphMode",
            ConvertError::Conversion { .. } => "GenericConversionFailure",
            ConvertError::Csv(_) => "CsvError",
            ConvertError::Spreadsheet(_) => "SpreadsheetError",
            ConvertError::Workbook(_) => "WorkbookError",
            ConvertError::Io(_) => "IoError",
        }
    }

    /// Whether this error already carries a specific, caller-facing message.
    /// Everything else is wrapped into [`ConvertError::Conversion`].
    pub fn is_specific(&self) -> bool {
        matches!(
            self,
            ConvertError::UnsupportedFileType { .. }
                | ConvertError::FileNotFound(_)
                | ConvertError::NoReadableInput
                | ConvertError::MissingRequiredField { .. }
                | ConvertError::InvalidMapping(_)
                | ConvertError::MissingPairColumns
                | ConvertError::UnknownGraphMode(_)
                | ConvertError::Conversion { .. }
        )
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;
