use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use encoding_rs::UTF_16BE;
use lopdf::Document;
use lopdf::Object;
use lopdf::content::Content;
use tracing::debug;

use crate::error::ExtractError;
use crate::model::PageText;
use crate::tokens::{find_date_token, is_amount};

/// Source of per-page linear text. Unlike table detection, a failure here is
/// fatal to the conversion.
pub trait TextExtractor: Send + Sync {
    /// One entry per page, in page order. Image-only pages yield empty text.
    fn extract_page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, ExtractError>;
}

/// Text extractor built on `lopdf` and `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, ExtractError> {
        read_pdf_pages_from_bytes(pdf)
    }
}

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let utf16_hint = encoding.is_some_and(|name| {
        let lower = name.to_ascii_lowercase();
        lower.contains("utf16") || lower.contains("ucs2") || lower.contains("identity-h")
    });
    let has_bom = bytes.starts_with(&[0xFE, 0xFF]);
    if has_bom || utf16_hint {
        let body = if has_bom { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(body);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).to_string()
}

/// Favors candidates whose lines look like statement rows.
fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut non_empty_lines = 0_i64;
    let mut amount_lines = 0_i64;
    let mut dated_lines = 0_i64;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        non_empty_lines += 1;
        if is_amount(line) {
            amount_lines += 1;
        }
        if find_date_token(line).is_some() {
            dated_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    amount_lines * 40 + dated_lines * 20 + non_empty_lines - broken_penalty
}

fn choose_best_text(candidates: Vec<String>) -> String {
    candidates
        .into_iter()
        .max_by_key(|text| extraction_quality_score(text))
        .unwrap_or_default()
}

fn extract_text_from_page_content(document: &Document, page_id: lopdf::ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => collect_text(text, encoding, items),
                // Large negative kerning inside TJ arrays separates words.
                Object::Integer(value) if *value < -100 => text.push(' '),
                Object::Real(value) if *value < -100.0 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Runs `pdf-extract`, which may panic on unusual fonts, behind an unwind
/// boundary.
fn extract_whole_text(input_pdf: &[u8]) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(input_pdf)
    })) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(error)) => {
            debug!(%error, "pdf-extract failed; using content stream text only");
            None
        }
        Err(_) => {
            debug!("pdf-extract panicked; using content stream text only");
            None
        }
    }
}

pub(crate) fn read_pdf_pages_from_bytes(input_pdf: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    let pages_map = document.get_pages();
    if pages_map.is_empty() {
        return Err(ExtractError::MalformedInput(
            "document has no pages".to_string(),
        ));
    }

    let pdf_extract_pages = extract_whole_text(input_pdf)
        .map(|text| split_text_into_pages(&text))
        .filter(|pages| pages.len() == pages_map.len());

    let mut pages = Vec::with_capacity(pages_map.len());
    for (index, (page_no, page_id)) in pages_map.iter().enumerate() {
        let mut candidates = Vec::new();
        if let Some(text) = pdf_extract_pages
            .as_ref()
            .and_then(|split| split.get(index).cloned())
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }
        if let Some(text) = extract_text_from_page_content(&document, *page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[*page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        debug!(page = *page_no, candidates = candidates.len(), "extracted page text");
        pages.push(PageText {
            page_number: *page_no,
            text: choose_best_text(candidates),
        });
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::{
        extraction_quality_score, looks_decoding_broken, read_pdf_pages_from_bytes,
        split_text_into_pages,
    };
    use crate::error::ExtractError;

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn flags_replacement_heavy_text_as_broken() {
        assert!(looks_decoding_broken("\u{FFFD}\u{FFFD}ab"));
        assert!(looks_decoding_broken("?Identity-H Unimplemented?"));
        assert!(!looks_decoding_broken("PAYROLL DEPOSIT 2,500.00 NOV03"));
    }

    #[test]
    fn prefers_text_with_statement_rows() {
        let prose = "Thank you\nfor banking\nwith us\ntoday";
        let rows = "COFFEE SHOP 4.50 OCT01";
        assert!(extraction_quality_score(rows) > extraction_quality_score(prose));
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        let error = read_pdf_pages_from_bytes(b"not a pdf").expect_err("should fail");
        assert!(matches!(error, ExtractError::MalformedInput(_)));
    }
}
