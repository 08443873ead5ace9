use std::collections::HashSet;

use crate::record::JobRecord;

/// Drops records equal on every field to an earlier one, keeping order.
pub fn dedupe(batch: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}
