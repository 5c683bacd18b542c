use serde::Serialize;

use crate::warning::ExtractWarning;

/// Column headers of every exported statement table, in output order.
pub const OUTPUT_HEADERS: [&str; 4] = ["DESCRIPTION", "CHEQUE/DEBIT", "DEPOSIT/CREDIT", "DATE"];

/// Date value used when a row carries no recognizable date token.
pub const NO_DATE: &str = "N/A";

/// One cell as reported by a table detector; `None` for an empty grid slot.
pub type RawCell = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateTable {
    /// Source page, when the detector knows it.
    pub page: Option<u32>,
    pub rows: Vec<Vec<RawCell>>,
}

impl CandidateTable {
    /// Builds a table without page attribution from plain string rows.
    #[must_use]
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            page: None,
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
                .collect(),
        }
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Table,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub description: String,
    pub debit: String,
    pub credit: String,
    pub date: String,
    #[serde(rename = "page")]
    pub page_number: u32,
    #[serde(skip)]
    pub source: RecordSource,
}

impl TransactionRecord {
    /// The populated amount, whichever column it sits in.
    #[must_use]
    pub fn amount(&self) -> &str {
        if self.debit.is_empty() {
            &self.credit
        } else {
            &self.debit
        }
    }

    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            description: crate::normalize::normalize_description(&self.description),
            amount: self.amount().to_string(),
            date: self.date.clone(),
        }
    }

    /// Row in `OUTPUT_HEADERS` order.
    #[must_use]
    pub fn to_row(&self) -> [&str; 4] {
        [&self.description, &self.debit, &self.credit, &self.date]
    }
}

/// Identity of a transaction across both parsing sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub description: String,
    pub amount: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub records: Vec<TransactionRecord>,
    pub table_count: usize,
    pub table_rows: usize,
    pub text_rows: usize,
    pub duplicates_dropped: usize,
    pub warnings: Vec<ExtractWarning>,
}
