use serde::{Deserialize, Serialize};
use stmt_table::{ExtractWarning, TransactionRecord};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_FILENAME_STEM: &str = "statement";

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResponse {
    pub rows: Vec<TransactionRecord>,
    pub row_count: usize,
    pub table_count: usize,
    pub duplicates_dropped: usize,
    pub warnings: Vec<ExtractWarning>,
    pub converted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
