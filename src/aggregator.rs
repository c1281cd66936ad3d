
use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::{AggregatedRecord, ClassifiedRecord};

/// (condition, replicate)
type GroupKey = (String, String);

/// Sums percentages per (condition, replicate, class).
/// Output has one row per triple that has at least one classified record; absent classes are not zero-filled.
/// Groups keep first-seen order of (condition, replicate), and classes within a group are in `IndelClass` order.
pub fn aggregate(records: &[ClassifiedRecord]) -> Vec<AggregatedRecord> {
    let mut groups: IndexMap<GroupKey, BTreeMap<IndelClass, f64>> = IndexMap::new();
    for classified in records.iter() {
        let record = &classified.record;
        let key = (record.condition.clone(), record.replicate.clone());
        let entry = groups.entry(key).or_default()
            .entry(classified.class).or_default();
        *entry += record.percentage;
    }

    groups.into_iter()
        .flat_map(|((condition, replicate), class_sums)| {
            class_sums.into_iter()
                .map(move |(class, summed)| {
                    AggregatedRecord::new(condition.clone(), replicate.clone(), class, summed)
                })
        })
        .collect()
}
