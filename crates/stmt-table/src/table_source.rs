use tracing::debug;

use crate::model::{CandidateTable, RawCell, RecordSource, TransactionRecord};
use crate::normalize::RowNormalizer;
use crate::warning::{ExtractWarning, WarningCode};

fn is_header_row(row: &[RawCell]) -> bool {
    row.first()
        .and_then(Option::as_deref)
        .is_some_and(|cell| cell.to_uppercase().contains("DESCRIPTION"))
}

/// Best-effort page for a table whose detector did not report one: roughly two
/// tables per page, clamped to the document.
pub(crate) fn estimate_page(table_index: usize, page_count: u32) -> u32 {
    let estimate = u32::try_from(table_index / 2 + 1).unwrap_or(u32::MAX);
    estimate.clamp(1, page_count.max(1))
}

pub(crate) fn parse_tables(
    tables: &[CandidateTable],
    page_count: u32,
    normalizer: &RowNormalizer<'_>,
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<TransactionRecord> {
    let mut records = Vec::new();

    for (index, table) in tables.iter().enumerate() {
        let table_id = index + 1;
        let page = table.page.unwrap_or_else(|| {
            let estimate = estimate_page(index, page_count);
            warnings.push(
                ExtractWarning::new(
                    WarningCode::PageEstimated,
                    "table detector did not report a page; page number is estimated",
                )
                .with_page(estimate)
                .with_table_id(table_id),
            );
            estimate
        });

        let skip = usize::from(table.rows.first().is_some_and(|row| is_header_row(row)));
        let before = records.len();
        records.extend(
            table
                .rows
                .iter()
                .skip(skip)
                .filter_map(|row| normalizer.normalize_row(row, page, RecordSource::Table)),
        );

        debug!(
            table_id,
            page,
            rows = table.rows.len(),
            header = skip == 1,
            kept = records.len() - before,
            "parsed candidate table"
        );
    }

    records
}
