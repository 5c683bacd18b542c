use tracing::debug;

use crate::error::ExtractError;
use crate::model::{CandidateTable, PageText};
use crate::pdf_reader::{PdfTextExtractor, TextExtractor};
use crate::table_parse::{CellSpan, align_to_anchors, split_line_into_spans};

/// Source of candidate tables for a PDF. Implementations may misalign columns
/// or return nothing; callers treat any error as "no tables".
pub trait TableDetector: Send + Sync {
    fn detect_tables(&self, pdf: &[u8]) -> Result<Vec<CandidateTable>, ExtractError>;

    /// Same as [`TableDetector::detect_tables`], given the page text already
    /// extracted from `pdf`. Text-based detectors override this to skip a
    /// second extraction pass.
    fn detect_tables_in(
        &self,
        pdf: &[u8],
        _pages: &[PageText],
    ) -> Result<Vec<CandidateTable>, ExtractError> {
        self.detect_tables(pdf)
    }
}

/// Detects tables from runs of text lines laid out in whitespace-separated
/// columns. Cells are aligned to the columns of the most recent `DESCRIPTION`
/// header, which carries over to later runs and pages, so empty debit/credit
/// slots survive. Runs seen before any header yield no table.
#[derive(Debug, Clone)]
pub struct LayoutTableDetector {
    min_cols: usize,
    extractor: PdfTextExtractor,
}

impl Default for LayoutTableDetector {
    fn default() -> Self {
        Self::new(2)
    }
}

impl LayoutTableDetector {
    #[must_use]
    pub fn new(min_cols: usize) -> Self {
        Self {
            min_cols: min_cols.max(2),
            extractor: PdfTextExtractor,
        }
    }

    #[must_use]
    pub fn detect_in_pages(&self, pages: &[PageText]) -> Vec<CandidateTable> {
        let mut anchors = None;
        pages
            .iter()
            .flat_map(|page| detect_tables_in_page(page, self.min_cols, &mut anchors))
            .collect()
    }
}

impl TableDetector for LayoutTableDetector {
    fn detect_tables(&self, pdf: &[u8]) -> Result<Vec<CandidateTable>, ExtractError> {
        let pages = self.extractor.extract_page_texts(pdf)?;
        Ok(self.detect_in_pages(&pages))
    }

    fn detect_tables_in(
        &self,
        _pdf: &[u8],
        pages: &[PageText],
    ) -> Result<Vec<CandidateTable>, ExtractError> {
        Ok(self.detect_in_pages(pages))
    }
}

fn is_header(row: &[CellSpan]) -> bool {
    row.first()
        .is_some_and(|cell| cell.text.to_uppercase().contains("DESCRIPTION"))
}

fn flush_run(
    page: u32,
    run: &mut Vec<Vec<CellSpan>>,
    anchors: &mut Option<Vec<CellSpan>>,
    tables: &mut Vec<CandidateTable>,
) {
    let rows = std::mem::take(run);
    let Some(first) = rows.first() else {
        return;
    };
    if is_header(first) {
        *anchors = Some(first.clone());
    }
    if rows.len() < 2 {
        return;
    }

    let Some(anchors) = anchors.as_deref() else {
        debug!(page, rows = rows.len(), "columnar run before any header, left to text parsing");
        return;
    };

    tables.push(CandidateTable {
        page: Some(page),
        rows: rows
            .iter()
            .map(|row| align_to_anchors(row, anchors))
            .collect(),
    });
}

fn detect_tables_in_page(
    page: &PageText,
    min_cols: usize,
    anchors: &mut Option<Vec<CellSpan>>,
) -> Vec<CandidateTable> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<CellSpan>> = Vec::new();

    for line in page.text.lines() {
        let spans = split_line_into_spans(line);
        if spans.len() >= min_cols {
            run.push(spans);
        } else {
            flush_run(page.page_number, &mut run, anchors, &mut tables);
        }
    }

    flush_run(page.page_number, &mut run, anchors, &mut tables);
    tables
}
