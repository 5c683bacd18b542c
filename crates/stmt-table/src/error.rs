use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("input is not a readable PDF: {0}")]
    MalformedInput(String),

    #[error("table extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("{stage} did not finish within {}s", .limit.as_secs())]
    Timeout { stage: &'static str, limit: Duration },

    #[error("no transaction data found in PDF")]
    NoDataFound,

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ExtractError {
    /// `true` for the user-facing "nothing to export" outcome, as opposed to a
    /// failure of the PDF or of the extraction libraries.
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoDataFound)
    }
}

impl From<lopdf::Error> for ExtractError {
    fn from(error: lopdf::Error) -> Self {
        Self::MalformedInput(error.to_string())
    }
}
