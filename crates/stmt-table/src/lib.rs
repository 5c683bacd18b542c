mod error;
mod merge;
mod model;
mod noise;
mod normalize;
mod options;
mod pdf_reader;
mod sink;
mod table_detect;
mod table_parse;
mod table_source;
mod text_source;
mod timeout;
mod tokens;
mod warning;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::merge::merge_records;
use crate::sink::write_table_to_path;
use crate::text_source::TextSourceParser;
use crate::timeout::run_with_timeout;

pub use error::ExtractError;
pub use model::{
    CandidateTable, DedupKey, NO_DATE, OUTPUT_HEADERS, PageText, RawCell, Reconstruction,
    RecordSource, TransactionRecord,
};
pub use noise::{DEFAULT_NOISE_PHRASES, NoiseRules};
pub use normalize::{
    AmountSide, DEFAULT_WITHDRAWAL_KEYWORDS, RowNormalizer, clean_cell, normalize_description,
};
pub use options::{
    DEFAULT_EXTRACTION_TIMEOUT, ExtractOptions, NoiseLinePolicy, OutputFormat, PageSelection,
};
pub use pdf_reader::{PdfTextExtractor, TextExtractor};
pub use sink::{XLSX_SHEET_NAME, write_table, write_table_to_bytes, write_table_to_string};
pub use table_detect::{LayoutTableDetector, TableDetector};
pub use tokens::{
    DateToken, TokenMatch, extract_amount, find_amount, find_date_token, is_amount,
    is_bare_date_token, parse_date_token,
};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

use crate::warning::WarningCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub table_count: usize,
    pub table_rows: usize,
    pub text_rows: usize,
    pub duplicates_dropped: usize,
    pub warnings: Vec<ExtractWarning>,
}

impl From<&Reconstruction> for ExtractionReport {
    fn from(reconstruction: &Reconstruction) -> Self {
        Self {
            row_count: reconstruction.records.len(),
            table_count: reconstruction.table_count,
            table_rows: reconstruction.table_rows,
            text_rows: reconstruction.text_rows,
            duplicates_dropped: reconstruction.duplicates_dropped,
            warnings: reconstruction.warnings.clone(),
        }
    }
}

/// The two extraction services a conversion runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn TableDetector>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl Collaborators {
    #[must_use]
    pub fn new(detector: Arc<dyn TableDetector>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            detector,
            extractor,
        }
    }

    /// `lopdf`/`pdf-extract` backed collaborators configured from `options`.
    #[must_use]
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::new(
            Arc::new(LayoutTableDetector::new(options.min_cols)),
            Arc::new(PdfTextExtractor),
        )
    }
}

fn apply_page_selection(
    tables: &[CandidateTable],
    pages: &[PageText],
    selection: Option<&PageSelection>,
) -> Result<(Vec<CandidateTable>, Vec<PageText>), ExtractError> {
    let Some(selection) = selection else {
        return Ok((tables.to_vec(), pages.to_vec()));
    };

    let pages = pages
        .iter()
        .filter(|page| selection.contains(page.page_number))
        .cloned()
        .collect::<Vec<_>>();
    if pages.is_empty() {
        return Err(ExtractError::InvalidPageSelection(
            "no pages available after applying selection".to_string(),
        ));
    }

    let tables = tables
        .iter()
        .filter(|table| table.page.is_none_or(|page| selection.contains(page)))
        .cloned()
        .collect();

    Ok((tables, pages))
}

fn reconstruct_with_warnings(
    tables: &[CandidateTable],
    pages: &[PageText],
    options: &ExtractOptions,
    mut warnings: Vec<ExtractWarning>,
) -> Result<Reconstruction, ExtractError> {
    options.validate()?;
    let (tables, pages) = apply_page_selection(tables, pages, options.pages.as_ref())?;

    let normalizer = RowNormalizer::from_options(options);
    let page_count = pages.iter().map(|page| page.page_number).max().unwrap_or(1);

    let table_records = table_source::parse_tables(&tables, page_count, &normalizer, &mut warnings);
    let text_records = TextSourceParser::new(&normalizer, options.noise_line_policy)
        .parse_pages(&pages, &mut warnings);
    let table_rows = table_records.len();
    let text_rows = text_records.len();

    let merged = merge_records(table_records, text_records);
    info!(
        tables = tables.len(),
        table_rows,
        text_rows,
        duplicates = merged.duplicates_dropped,
        rows = merged.records.len(),
        "reconstructed statement table"
    );

    if merged.records.is_empty() {
        return Err(ExtractError::NoDataFound);
    }

    Ok(Reconstruction {
        records: merged.records,
        table_count: tables.len(),
        table_rows,
        text_rows,
        duplicates_dropped: merged.duplicates_dropped,
        warnings,
    })
}

/// Builds the transaction table from already-extracted tables and page text.
///
/// Table rows take priority over text lines describing the same transaction.
/// Fails with [`ExtractError::NoDataFound`] when neither source yields a row.
pub fn reconstruct(
    tables: &[CandidateTable],
    pages: &[PageText],
    options: &ExtractOptions,
) -> Result<Reconstruction, ExtractError> {
    reconstruct_with_warnings(tables, pages, options, Vec::new())
}

/// Runs both collaborators over `pdf_bytes`, then [`reconstruct`]. The
/// detector receives the extracted page text, so text-based detectors do not
/// parse the document a second time.
///
/// Text extraction failures are fatal. A failing or timed-out table detector
/// only adds an `ExtractionUnavailable` warning and parsing continues on page
/// text alone.
pub fn extract_statement(
    pdf_bytes: &[u8],
    collaborators: &Collaborators,
    options: &ExtractOptions,
) -> Result<Reconstruction, ExtractError> {
    options.validate()?;
    let pdf: Arc<[u8]> = Arc::from(pdf_bytes);

    let pages: Arc<[PageText]> = {
        let extractor = Arc::clone(&collaborators.extractor);
        let pdf = Arc::clone(&pdf);
        run_with_timeout("text extraction", options.extraction_timeout, move || {
            extractor.extract_page_texts(&pdf)
        })?
        .into()
    };
    if pages.is_empty() {
        return Err(ExtractError::MalformedInput(
            "document has no pages".to_string(),
        ));
    }

    let mut warnings = Vec::new();
    let detector = Arc::clone(&collaborators.detector);
    let detector_pages = Arc::clone(&pages);
    let tables = match run_with_timeout("table detection", options.extraction_timeout, move || {
        detector.detect_tables_in(&pdf, &detector_pages)
    }) {
        Ok(tables) => tables,
        Err(error) => {
            warn!(%error, "table detector failed; continuing with page text only");
            warnings.push(ExtractWarning::new(
                WarningCode::ExtractionUnavailable,
                error.to_string(),
            ));
            Vec::new()
        }
    };

    if tables.is_empty() {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no candidate tables were detected; rows come from page text",
        ));
    }

    reconstruct_with_warnings(&tables, &pages, options, warnings)
}

/// [`extract_statement`] with the default `lopdf`/`pdf-extract` collaborators.
pub fn extract_statement_from_bytes(
    pdf_bytes: &[u8],
    options: &ExtractOptions,
) -> Result<Reconstruction, ExtractError> {
    extract_statement(pdf_bytes, &Collaborators::from_options(options), options)
}

pub fn extract_pdf_to_file(
    input_pdf: &Path,
    output: &Path,
    format: OutputFormat,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let bytes = std::fs::read(input_pdf)?;
    let reconstruction = extract_statement_from_bytes(&bytes, options)?;
    write_table_to_path(output, &reconstruction.records, format, options.delimiter)?;
    Ok(ExtractionReport::from(&reconstruction))
}

pub fn extract_pdf_bytes_to_string(
    input_pdf: &[u8],
    format: OutputFormat,
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    let reconstruction = extract_statement_from_bytes(input_pdf, options)?;
    let output = write_table_to_string(&reconstruction.records, format, options.delimiter)?;
    Ok((output, ExtractionReport::from(&reconstruction)))
}
