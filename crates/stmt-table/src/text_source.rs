//! Line scanner that reassembles transactions from a page's linear text.
//!
//! Each non-blank line is classified once, then applied against a single
//! pending-description register:
//!
//! 1. noise lines are skipped (the register survives unless
//!    [`NoiseLinePolicy::ClearPending`] is configured);
//! 2. a line holding description, amount and trailing date emits directly;
//! 3. an amount+date line completes the pending description, if any;
//! 4. a text-only line becomes the pending description;
//! 5. anything else clears the register.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::model::{PageText, RecordSource, TransactionRecord};
use crate::normalize::{AmountSide, RowNormalizer, clean_cell, normalize_description};
use crate::options::NoiseLinePolicy;
use crate::tokens::{DateToken, find_amount, find_date_token, is_bare_date_token};
use crate::warning::{ExtractWarning, WarningCode};

static FULL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?P<desc>.*?[A-Z](?:.*?[^0-9])?)\s*",
        r"(?P<amount>\d{1,3}(?:[, ]\d{3})+\.\d{2}|\d+\.\d{2})",
        r"(?P<rest>(?:.*[^A-Z])?)",
        r"(?P<month>JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\.?\s*(?P<day>\d{1,2})\s*$",
    ))
    .expect("hardcoded full-line regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum LineShape {
    Noise,
    Full {
        description: String,
        amount: String,
        date: String,
    },
    AmountDate {
        amount: String,
        date: String,
    },
    DescriptionOnly,
    Unmatched,
}

#[derive(Debug, Default)]
struct ParseState {
    pending_description: Option<String>,
}

pub(crate) struct TextSourceParser<'a> {
    normalizer: &'a RowNormalizer<'a>,
    policy: NoiseLinePolicy,
}

impl<'a> TextSourceParser<'a> {
    pub(crate) fn new(normalizer: &'a RowNormalizer<'a>, policy: NoiseLinePolicy) -> Self {
        Self { normalizer, policy }
    }

    pub(crate) fn parse_pages(
        &self,
        pages: &[PageText],
        warnings: &mut Vec<ExtractWarning>,
    ) -> Vec<TransactionRecord> {
        let mut records = Vec::new();
        for page in pages {
            if page.text.trim().is_empty() {
                warnings.push(
                    ExtractWarning::new(WarningCode::EmptyPageText, "page has no extractable text")
                        .with_page(page.page_number),
                );
                continue;
            }

            let before = records.len();
            records.extend(self.parse_page(page));
            debug!(
                page = page.page_number,
                kept = records.len() - before,
                "scanned page text"
            );
        }
        records
    }

    pub(crate) fn parse_page(&self, page: &PageText) -> Vec<TransactionRecord> {
        let mut state = ParseState::default();
        let mut records = Vec::new();

        for line in page.text.lines() {
            let line = clean_cell(Some(line));
            if line.is_empty() {
                continue;
            }

            let shape = self.classify(&line);
            trace!(line = %line, shape = ?shape, pending = ?state.pending_description, "text line");

            match shape {
                LineShape::Noise => {
                    if self.policy == NoiseLinePolicy::ClearPending {
                        state.pending_description = None;
                    }
                }
                LineShape::Full {
                    description,
                    amount,
                    date,
                } => {
                    state.pending_description = None;
                    records.extend(self.emit(&description, &amount, &date, page.page_number));
                }
                LineShape::AmountDate { amount, date } => {
                    if let Some(description) = state.pending_description.take() {
                        records.extend(self.emit(&description, &amount, &date, page.page_number));
                    }
                }
                LineShape::DescriptionOnly => {
                    state.pending_description = Some(line);
                }
                LineShape::Unmatched => {
                    state.pending_description = None;
                }
            }
        }

        records
    }

    fn classify(&self, line: &str) -> LineShape {
        if self.normalizer.noise().is_noise(&normalize_description(line)) {
            return LineShape::Noise;
        }

        if let Some(shape) = match_full_line(line) {
            return shape;
        }

        let amount = find_amount(line);
        if let (Some(amount), Some(date)) = (&amount, find_date_token(line)) {
            return LineShape::AmountDate {
                amount: amount.value.clone(),
                date: date.value.canonical(),
            };
        }

        if amount.is_none()
            && line.chars().any(char::is_alphabetic)
            && !is_bare_date_token(line)
        {
            return LineShape::DescriptionOnly;
        }

        LineShape::Unmatched
    }

    /// Text lines carry no column position, so the description decides the side.
    fn emit(
        &self,
        description: &str,
        amount: &str,
        date: &str,
        page_number: u32,
    ) -> Option<TransactionRecord> {
        let side = self.normalizer.side_for(&normalize_description(description));
        let (debit, credit) = match side {
            AmountSide::Debit => (amount, ""),
            AmountSide::Credit => ("", amount),
        };
        let cells = [description, debit, credit, date].map(|cell| Some(cell.to_string()));
        self.normalizer
            .normalize_row(&cells, page_number, RecordSource::Text)
    }
}

fn match_full_line(line: &str) -> Option<LineShape> {
    let captures = FULL_LINE_RE.captures(line)?;
    let amount_end = captures.name("amount")?.end();
    if line[amount_end..].starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    let description = clean_cell(captures.name("desc").map(|found| found.as_str()));
    let amount = find_amount(captures.name("amount")?.as_str())?.value;
    let date = DateToken::new(
        captures.name("month")?.as_str(),
        captures.name("day")?.as_str().parse().ok()?,
    )?;

    Some(LineShape::Full {
        description,
        amount,
        date: date.canonical(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{LineShape, TextSourceParser, match_full_line};
    use crate::model::{PageText, RecordSource};
    use crate::normalize::RowNormalizer;
    use crate::options::{ExtractOptions, NoiseLinePolicy};

    fn page(lines: &[&str]) -> PageText {
        PageText {
            page_number: 2,
            text: lines.join("\n"),
        }
    }

    fn rows(lines: &[&str], policy: NoiseLinePolicy) -> Vec<[String; 4]> {
        let options = ExtractOptions::default();
        let normalizer = RowNormalizer::from_options(&options);
        let parser = TextSourceParser::new(&normalizer, policy);
        parser
            .parse_page(&page(lines))
            .iter()
            .map(|record| record.to_row().map(str::to_string))
            .collect()
    }

    fn row(cells: [&str; 4]) -> [String; 4] {
        cells.map(str::to_string)
    }

    #[test]
    fn full_line_with_glued_date_is_a_debit() {
        let shape = match_full_line("ATM WITHDRAWAL 100.00OCT15").expect("full match");
        assert_eq!(
            shape,
            LineShape::Full {
                description: "ATM WITHDRAWAL".to_string(),
                amount: "100.00".to_string(),
                date: "OCT15".to_string(),
            }
        );

        assert_eq!(
            rows(&["ATM WITHDRAWAL 100.00OCT15"], NoiseLinePolicy::default()),
            vec![row(["ATM WITHDRAWAL", "100.00", "", "OCT15"])]
        );
    }

    #[test]
    fn full_line_keeps_digits_inside_description() {
        let shape = match_full_line("E-TFR REF12 34.00 1,200.00 NOV 9").expect("full match");
        assert_eq!(
            shape,
            LineShape::Full {
                description: "E-TFR REF12".to_string(),
                amount: "34.00".to_string(),
                date: "NOV09".to_string(),
            }
        );
    }

    #[test]
    fn cheque_number_stays_in_description() {
        assert_eq!(
            rows(&["CHQ 12345 100.00 OCT01"], NoiseLinePolicy::default()),
            vec![row(["CHQ 12345", "", "100.00", "OCT01"])]
        );
    }

    #[test]
    fn split_description_and_amount_lines_merge_into_credit() {
        assert_eq!(
            rows(
                &["PAYROLL DEPOSIT ACME CORP", "2,500.00 NOV03"],
                NoiseLinePolicy::default()
            ),
            vec![row(["PAYROLL DEPOSIT ACME CORP", "", "2500.00", "NOV03"])]
        );
    }

    #[test]
    fn amount_line_without_pending_description_emits_nothing() {
        assert!(rows(&["2,500.00 NOV03"], NoiseLinePolicy::default()).is_empty());
    }

    #[test]
    fn pending_description_is_used_once() {
        assert_eq!(
            rows(
                &["GYM MEMBERSHIP", "45.00 OCT07", "12.00 OCT08"],
                NoiseLinePolicy::default()
            ),
            vec![row(["GYM MEMBERSHIP", "", "45.00", "OCT07"])]
        );
    }

    #[test]
    fn later_description_replaces_pending_one() {
        assert_eq!(
            rows(
                &["FIRST LINE TEXT", "SEND E-TFR JANE", "75.00 OCT09"],
                NoiseLinePolicy::default()
            ),
            vec![row(["SEND E-TFR JANE", "75.00", "", "OCT09"])]
        );
    }

    #[test]
    fn noise_line_keeps_pending_description_by_default() {
        let lines = ["PAYROLL DEPOSIT ACME CORP", "STATEMENT OF ACCOUNT", "2,500.00 NOV03"];
        assert_eq!(rows(&lines, NoiseLinePolicy::KeepPending).len(), 1);
        assert!(rows(&lines, NoiseLinePolicy::ClearPending).is_empty());
    }

    #[test]
    fn bare_date_line_clears_pending_description() {
        assert!(
            rows(
                &["PAYROLL DEPOSIT ACME CORP", "NOV03", "2,500.00 NOV03"],
                NoiseLinePolicy::default()
            )
            .is_empty()
        );
    }

    #[test]
    fn records_are_tagged_with_page_and_source() {
        let options = ExtractOptions::default();
        let normalizer = RowNormalizer::from_options(&options);
        let parser = TextSourceParser::new(&normalizer, NoiseLinePolicy::default());
        let records = parser.parse_page(&page(&["COFFEE SHOP 4.50 OCT01"]));
        assert_eq!(records[0].page_number, 2);
        assert_eq!(records[0].source, RecordSource::Text);
    }

    #[test]
    fn empty_page_produces_warning() {
        let options = ExtractOptions::default();
        let normalizer = RowNormalizer::from_options(&options);
        let parser = TextSourceParser::new(&normalizer, NoiseLinePolicy::default());
        let mut warnings = Vec::new();
        let records = parser.parse_pages(&[page(&["   "])], &mut warnings);
        assert!(records.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
