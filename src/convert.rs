use chrono::{SecondsFormat, Utc};
use stmt_table::{
    ExtractOptions, OutputFormat, PageSelection, Reconstruction, extract_statement_from_bytes,
    write_table_to_bytes,
};
use worker::Env;

use crate::error::ApiError;
use crate::models::{ConvertResponse, DEFAULT_MAX_UPLOAD_BYTES};

/// Deployment settings read from worker vars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub noise_phrases: Vec<String>,
    pub withdrawal_keywords: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            noise_phrases: Vec::new(),
            withdrawal_keywords: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ConvertConfig {
    pub fn from_env(env: &Env) -> Result<Self, ApiError> {
        let var = |name: &str| env.var(name).map(|value| value.to_string()).ok();

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_max_upload_bytes(&raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            noise_phrases: var("NOISE_PHRASES")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            withdrawal_keywords: var("WITHDRAWAL_KEYWORDS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            max_upload_bytes,
        })
    }

    /// Extra noise phrases extend the built-in list; withdrawal keywords
    /// replace the defaults only when at least one is configured.
    pub fn extract_options(&self, pages: Option<PageSelection>) -> ExtractOptions {
        let mut options = ExtractOptions {
            pages,
            ..ExtractOptions::default()
        };
        options.noise.extend(&self.noise_phrases);
        if !self.withdrawal_keywords.is_empty() {
            options = options.with_withdrawal_keywords(&self.withdrawal_keywords);
        }
        options
    }
}

/// Splits a `|`-separated var value, dropping blank entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn parse_max_upload_bytes(raw: &str) -> Result<usize, ApiError> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ApiError::Internal(format!(
            "MAX_UPLOAD_BYTES must be a positive integer, got '{raw}'"
        ))),
        Ok(limit) => Ok(limit),
    }
}

/// Cheap checks run before any PDF parsing.
pub fn validate_body(body: &[u8], max_upload_bytes: usize) -> Result<(), ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }
    if body.len() > max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "request body is {} bytes, limit is {max_upload_bytes}",
            body.len()
        )));
    }
    if !body.starts_with(b"%PDF") {
        return Err(ApiError::MalformedInput(
            "request body is not a PDF document".to_string(),
        ));
    }
    Ok(())
}

pub fn convert_pdf_bytes(pdf_bytes: &[u8], options: &ExtractOptions) -> Result<Reconstruction, ApiError> {
    let reconstruction = extract_statement_from_bytes(pdf_bytes, options)?;

    worker::console_log!(
        "statement conversion completed: rows={}, tables={}, duplicates_dropped={}, warnings={}",
        reconstruction.records.len(),
        reconstruction.table_count,
        reconstruction.duplicates_dropped,
        reconstruction.warnings.len()
    );

    Ok(reconstruction)
}

/// File body for the download formats (CSV, XLSX).
pub fn render_attachment(
    reconstruction: &Reconstruction,
    format: OutputFormat,
) -> Result<Vec<u8>, ApiError> {
    Ok(write_table_to_bytes(&reconstruction.records, format, b',')?)
}

pub fn convert_response(reconstruction: Reconstruction) -> ConvertResponse {
    ConvertResponse {
        row_count: reconstruction.records.len(),
        table_count: reconstruction.table_count,
        duplicates_dropped: reconstruction.duplicates_dropped,
        warnings: reconstruction.warnings,
        rows: reconstruction.records,
        converted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
