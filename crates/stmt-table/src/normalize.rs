//! The single gate through which row-like evidence from either source becomes
//! a [`TransactionRecord`].

use tracing::trace;

use crate::model::{NO_DATE, RawCell, RecordSource, TransactionRecord};
use crate::noise::NoiseRules;
use crate::options::ExtractOptions;
use crate::tokens::{extract_amount, find_date_token};

/// Description fragments that mark an amount as money leaving the account.
pub const DEFAULT_WITHDRAWAL_KEYWORDS: &[&str] = &["SEND", "ATM", "WITHDRA", "AP", "TFR-TO"];

pub(crate) const ROW_SLOTS: usize = 5;

const DESCRIPTION: usize = 0;
const DEBIT: usize = 1;
const CREDIT: usize = 2;
const DATE: usize = 3;
const BALANCE: usize = 4;

/// Slots searched for a standalone date token, most likely first.
const DATE_SEARCH_ORDER: [usize; 4] = [DATE, CREDIT, DEBIT, BALANCE];

/// Trims and collapses internal whitespace; `None` becomes empty.
#[must_use]
pub fn clean_cell(cell: Option<&str>) -> String {
    cell.map(|value| value.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

#[must_use]
pub fn normalize_description(text: &str) -> String {
    clean_cell(Some(text)).to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSide {
    Debit,
    Credit,
}

#[derive(Debug, Clone)]
pub struct RowNormalizer<'a> {
    noise: &'a NoiseRules,
    withdrawal_keywords: &'a [String],
}

impl<'a> RowNormalizer<'a> {
    #[must_use]
    pub fn new(noise: &'a NoiseRules, withdrawal_keywords: &'a [String]) -> Self {
        Self {
            noise,
            withdrawal_keywords,
        }
    }

    #[must_use]
    pub fn from_options(options: &'a ExtractOptions) -> Self {
        Self::new(&options.noise, &options.withdrawal_keywords)
    }

    #[must_use]
    pub fn noise(&self) -> &NoiseRules {
        self.noise
    }

    /// Side an amount belongs to when no column position says so.
    #[must_use]
    pub fn side_for(&self, description_upper: &str) -> AmountSide {
        if self
            .withdrawal_keywords
            .iter()
            .any(|keyword| description_upper.contains(keyword.as_str()))
        {
            AmountSide::Debit
        } else {
            AmountSide::Credit
        }
    }

    /// Turns a ragged row of cells into a record, or `None` when the row is
    /// not a transaction (no amount, or a noise description).
    #[must_use]
    pub fn normalize_row(
        &self,
        cells: &[RawCell],
        page_number: u32,
        source: RecordSource,
    ) -> Option<TransactionRecord> {
        let mut slots = cells
            .iter()
            .take(ROW_SLOTS)
            .map(|cell| clean_cell(cell.as_deref()))
            .collect::<Vec<_>>();
        slots.resize(ROW_SLOTS, String::new());

        let date = take_date(&mut slots);
        let description_upper = slots[DESCRIPTION].to_uppercase();

        let (debit, credit) = match (extract_amount(&slots[DEBIT]), extract_amount(&slots[CREDIT])) {
            (None, None) => {
                trace!(row = ?slots, "row has no amount");
                return None;
            }
            (Some(debit), Some(credit)) => {
                trace!(row = ?slots, "row has amounts in both columns");
                match self.side_for(&description_upper) {
                    AmountSide::Debit => (debit, String::new()),
                    AmountSide::Credit => (String::new(), credit),
                }
            }
            (debit, credit) => (debit.unwrap_or_default(), credit.unwrap_or_default()),
        };

        if self.noise.is_noise(&description_upper) {
            trace!(description = %slots[DESCRIPTION], "row description is noise");
            return None;
        }

        Some(TransactionRecord {
            description: std::mem::take(&mut slots[DESCRIPTION]),
            debit,
            credit,
            date: date.unwrap_or_else(|| NO_DATE.to_string()),
            page_number,
            source,
        })
    }
}

/// Moves the first date token out of the value slots. Only the token itself is
/// cut from its cell, so an amount glued to the date stays in place.
fn take_date(slots: &mut [String]) -> Option<String> {
    for index in DATE_SEARCH_ORDER {
        if let Some(found) = find_date_token(&slots[index]) {
            slots[index].replace_range(found.start..found.end, " ");
            slots[index] = clean_cell(Some(&slots[index]));
            return Some(found.value.canonical());
        }
    }

    // A token split across the credit and date cells, e.g. "100.00 OCT" + "15".
    let combined = format!("{} {}", slots[CREDIT], slots[DATE]);
    let found = find_date_token(&combined)?;
    let mut residual = combined;
    residual.replace_range(found.start..found.end, " ");
    slots[CREDIT] = clean_cell(Some(&residual));
    slots[DATE].clear();
    Some(found.value.canonical())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{RowNormalizer, clean_cell};
    use crate::model::{RawCell, RecordSource, TransactionRecord};
    use crate::noise::NoiseRules;
    use crate::options::ExtractOptions;

    fn row(cells: &[&str]) -> Vec<RawCell> {
        cells.iter().map(|cell| Some((*cell).to_string())).collect()
    }

    fn normalize(cells: Vec<RawCell>) -> Option<TransactionRecord> {
        let options = ExtractOptions::default();
        RowNormalizer::from_options(&options).normalize_row(&cells, 1, RecordSource::Table)
    }

    #[test]
    fn cleans_cells() {
        assert_eq!(clean_cell(Some("  COFFEE \n  SHOP ")), "COFFEE SHOP");
        assert_eq!(clean_cell(None), "");
    }

    #[test]
    fn positional_debit_row() {
        let record = normalize(row(&["COFFEE SHOP", "4.50", "", "OCT01"])).expect("record");
        assert_eq!(record.to_row(), ["COFFEE SHOP", "4.50", "", "OCT01"]);
    }

    #[test]
    fn pads_short_rows_and_defaults_missing_date() {
        let record = normalize(row(&["INTEREST PAID", "", "1.25"])).expect("record");
        assert_eq!(record.to_row(), ["INTEREST PAID", "", "1.25", "N/A"]);
    }

    #[test]
    fn ignores_cells_past_the_fifth() {
        let record =
            normalize(row(&["RENT PAYMENT", "900.00", "", "NOV01", "1,000.00", "77.00"]))
                .expect("record");
        assert_eq!(record.to_row(), ["RENT PAYMENT", "900.00", "", "NOV01"]);
    }

    #[test]
    fn splits_date_glued_to_credit_amount() {
        let record = normalize(vec![
            Some("E-TRANSFER RECEIVED".to_string()),
            None,
            Some("250.00OCT15".to_string()),
            None,
        ])
        .expect("record");
        assert_eq!(record.credit, "250.00");
        assert_eq!(record.date, "OCT15");
    }

    #[test]
    fn joins_date_split_across_credit_and_date_cells() {
        let record = normalize(row(&["E-TRANSFER RECEIVED", "", "250.00 OCT", "15"])).expect("record");
        assert_eq!(record.credit, "250.00");
        assert_eq!(record.date, "OCT15");
    }

    #[test]
    fn amount_outside_debit_and_credit_columns_is_dropped() {
        assert_eq!(normalize(row(&["RUNNING TOTAL CARRIED", "", "", "5,000.00"])), None);
        assert_eq!(normalize(row(&["ATM WITHDRAWAL", "", "", "60.00 OCT02"])), None);
        assert_eq!(normalize(row(&["BALANCE FORWARD", "", "", "OCT01", "812.40"])), None);
    }

    #[test]
    fn both_amounts_resolved_by_keywords() {
        let record = normalize(row(&["PAYROLL", "10.00", "20.00", "OCT03"])).expect("record");
        assert_eq!(record.debit, "");
        assert_eq!(record.credit, "20.00");
    }

    #[test]
    fn drops_rows_without_amount_or_with_noise_description() {
        assert_eq!(normalize(row(&["COFFEE SHOP", "", "", "OCT01"])), None);
        assert_eq!(normalize(row(&["MONTHLY FEE REBATE", "4.00", "", "OCT31"])), None);
        assert_eq!(normalize(row(&["", "4.00", "", "OCT31"])), None);
    }

    #[test]
    fn custom_noise_rules_are_respected() {
        let noise = NoiseRules::with_phrases(["COFFEE"]);
        let keywords: Vec<String> = Vec::new();
        let normalizer = RowNormalizer::new(&noise, &keywords);
        let record =
            normalizer.normalize_row(&row(&["COFFEE SHOP", "4.50", "", "OCT01"]), 1, RecordSource::Table);
        assert_eq!(record, None);
    }
}
