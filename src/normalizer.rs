/*!
# Relative-percentage normalizer
Rescales summed percentages so that a chosen subset of classes sums to 100 within each (condition, replicate).
The denominator is the subset sum for that group, never the global sum.
*/
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::AggregatedRecord;

/// What to do with a (condition, replicate) whose subset sums to 0
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ZeroSumPolicy {
    /// Drop the group from the normalized output
    #[default]
    Skip,
    /// Keep the group and report 0 for every class
    Zero
}

/// A (condition, replicate) group whose subset summed to 0
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZeroSumGroup {
    pub condition: String,
    pub replicate: String
}

/// Outcome of one normalization pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizationReport {
    /// Groups that had a subset sum of 0
    pub zero_sum_groups: Vec<ZeroSumGroup>,
    /// Rows dropped because their class is outside the subset
    pub out_of_subset_rows: usize
}

/// Computes `relative_percentage` for every row whose class is in `subset`.
/// Rows outside the subset are not part of the output.
/// A group without any subset rows has a subset sum of 0 and follows `zero_policy` like any other zero-sum group;
/// with `ZeroSumPolicy::Zero` it gets one 0 row per subset class.
/// # Arguments
/// * `aggregated` - output of the aggregator
/// * `subset` - classes that make up the denominator
/// * `zero_policy` - handling of groups with a subset sum of 0
pub fn normalize(
    aggregated: &[AggregatedRecord], subset: &[IndelClass], zero_policy: ZeroSumPolicy
) -> (Vec<AggregatedRecord>, NormalizationReport) {
    let mut report = NormalizationReport::default();

    // every (condition, replicate) gets a group, even if none of its rows are in the subset
    let mut groups: IndexMap<(&str, &str), Vec<&AggregatedRecord>> = IndexMap::new();
    for record in aggregated.iter() {
        let group = groups.entry((record.condition.as_str(), record.replicate.as_str())).or_default();
        if subset.contains(&record.class) {
            group.push(record);
        } else {
            report.out_of_subset_rows += 1;
        }
    }

    let mut normalized = vec![];
    for ((condition, replicate), records) in groups.into_iter() {
        let subset_sum: f64 = records.iter().map(|r| r.summed_percentage).sum();
        if subset_sum != 0.0 {
            for record in records.into_iter() {
                let mut record = record.clone();
                record.relative_percentage = Some(record.summed_percentage / subset_sum * 100.0);
                normalized.push(record);
            }
            continue;
        }

        warn!("Subset sum is 0 for condition {condition:?}, replicate {replicate:?}; applying {zero_policy} policy");
        report.zero_sum_groups.push(ZeroSumGroup {
            condition: condition.to_string(),
            replicate: replicate.to_string()
        });
        if zero_policy == ZeroSumPolicy::Skip {
            continue;
        }

        if records.is_empty() {
            let mut classes = subset.to_vec();
            classes.sort();
            classes.dedup();
            for class in classes.into_iter() {
                let mut record = AggregatedRecord::new(condition.to_string(), replicate.to_string(), class, 0.0);
                record.relative_percentage = Some(0.0);
                normalized.push(record);
            }
        } else {
            for record in records.into_iter() {
                let mut record = record.clone();
                record.relative_percentage = Some(0.0);
                normalized.push(record);
            }
        }
    }

    (normalized, report)
}
