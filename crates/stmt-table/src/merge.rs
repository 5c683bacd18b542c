use std::collections::HashSet;

use tracing::trace;

use crate::model::TransactionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergeOutcome {
    pub records: Vec<TransactionRecord>,
    pub duplicates_dropped: usize,
}

/// Keeps the first record seen for every dedup key. Table records are visited
/// before text records, so a table row wins over the same transaction read
/// from page text. Encounter order is preserved.
pub(crate) fn merge_records(
    table_records: Vec<TransactionRecord>,
    text_records: Vec<TransactionRecord>,
) -> MergeOutcome {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(table_records.len() + text_records.len());
    let mut duplicates_dropped = 0;

    for record in table_records.into_iter().chain(text_records) {
        if seen.insert(record.dedup_key()) {
            records.push(record);
        } else {
            trace!(description = %record.description, source = ?record.source, "dropping duplicate");
            duplicates_dropped += 1;
        }
    }

    MergeOutcome {
        records,
        duplicates_dropped,
    }
}
