use std::collections::{BTreeMap, HashSet};

use crate::engine::types::{Record, normalize_value};

/// Records left after removing exact duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeduplicationResult {
    pub unique: Vec<Record>,
    pub duplicates_removed: usize,
}

/// Canonical comparison form of a record: top-level fields sorted by name,
/// serialized compactly. Nested values keep their own order; whole-valued
/// floats compare equal to the matching integer.
pub fn canonical_form(record: &Record) -> String {
    let sorted: BTreeMap<&str, serde_json::Value> = record
        .iter()
        .map(|(k, v)| (k.as_str(), normalize_value(v)))
        .collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Drop records whose canonical form was already seen. The first occurrence
/// wins and is kept with its original field order.
pub fn dedup<'a, I>(records: I) -> DeduplicationResult
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut total = 0;

    for record in records {
        total += 1;
        if seen.insert(canonical_form(record)) {
            unique.push(record.clone());
        }
    }

    let duplicates_removed = total - unique.len();
    DeduplicationResult {
        unique,
        duplicates_removed,
    }
}
