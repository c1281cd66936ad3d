/*!
# Significance filter
Zeroes percentage cells whose p-value is above a threshold.
Both tables must already be aligned (see `IndelTable::check_alignment`).
*/
use log::debug;
use serde::Serialize;

use crate::parsing::indel_table::{IndelTable, TableError};

/// The p-value cutoff used by the assay scripts
pub const DEFAULT_PVALUE_THRESHOLD: f64 = 0.001;

/// What to do with a percentage whose p-value cell is empty
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MissingPValuePolicy {
    /// Treat a missing p-value as p = 1, the percentage is zeroed
    #[default]
    NonSignificant,
    /// Keep the percentage as if it were significant
    Significant
}

/// Counts from one filtering pass
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FilterReport {
    /// Total cells visited
    pub total_cells: usize,
    /// Cells that were set to 0
    pub zeroed_cells: usize,
    /// Cells with an empty p-value
    pub missing_pvalues: usize
}

/// Applies the significance mask to `percentages` in place.
/// Every cell with p > `threshold` becomes 0; cells with p <= `threshold` are untouched.
/// Empty p-value cells follow `missing_policy`.
/// # Arguments
/// * `percentages` - the percentage table, modified in place
/// * `pvalues` - the p-value table
/// * `threshold` - significance cutoff
/// * `missing_policy` - handling of empty p-value cells
/// # Errors
/// * if the tables are not aligned
pub fn apply_significance_filter(
    percentages: &mut IndelTable, pvalues: &IndelTable,
    threshold: f64, missing_policy: MissingPValuePolicy
) -> Result<FilterReport, TableError> {
    percentages.check_alignment(pvalues)?;

    let mut report = FilterReport::default();
    for (perc_row, pval_row) in percentages.rows_mut().iter_mut().zip(pvalues.rows().iter()) {
        for (perc, pval) in perc_row.values.iter_mut().zip(pval_row.values.iter()) {
            report.total_cells += 1;
            let significant = match pval {
                Some(p) => *p <= threshold,
                None => {
                    report.missing_pvalues += 1;
                    missing_policy == MissingPValuePolicy::Significant
                }
            };

            if !significant {
                if perc.is_some_and(|v| v != 0.0) {
                    report.zeroed_cells += 1;
                }
                *perc = perc.map(|_| 0.0);
            }
        }
    }

    debug!("Significance filter: {report:?}");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::indel_table::IndelRow;

    fn tables(pvalue: Option<f64>) -> (IndelTable, IndelTable) {
        let conditions = vec!["sgLAD_6hr".to_string()];
        let perc = IndelTable::new("perc", conditions.clone(), vec![
            IndelRow::new("R1", 0, vec![Some(80.0)]),
        ]).unwrap();
        let pval = IndelTable::new("pval", conditions, vec![
            IndelRow::new("R1", 0, vec![pvalue]),
        ]).unwrap();
        (perc, pval)
    }

    #[test]
    fn test_significant_kept() {
        let (mut perc, pval) = tables(Some(0.0005));
        let report = apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::default()).unwrap();
        assert_eq!(perc.rows()[0].values, vec![Some(80.0)]);
        assert_eq!(report, FilterReport { total_cells: 1, zeroed_cells: 0, missing_pvalues: 0 });
    }

    #[test]
    fn test_boundary_kept() {
        let (mut perc, pval) = tables(Some(0.001));
        apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::default()).unwrap();
        assert_eq!(perc.rows()[0].values, vec![Some(80.0)]);
    }

    #[test]
    fn test_non_significant_zeroed() {
        let (mut perc, pval) = tables(Some(0.01));
        let report = apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::default()).unwrap();
        assert_eq!(perc.rows()[0].values, vec![Some(0.0)]);
        assert_eq!(report.zeroed_cells, 1);
    }

    #[test]
    fn test_missing_policy() {
        let (mut perc, pval) = tables(None);
        let report = apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::NonSignificant).unwrap();
        assert_eq!(perc.rows()[0].values, vec![Some(0.0)]);
        assert_eq!(report.missing_pvalues, 1);

        let (mut perc, pval) = tables(None);
        let report = apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::Significant).unwrap();
        assert_eq!(perc.rows()[0].values, vec![Some(80.0)]);
        assert_eq!(report.zeroed_cells, 0);
        assert_eq!(report.missing_pvalues, 1);
    }

    #[test]
    fn test_misaligned() {
        let (mut perc, _) = tables(None);
        let pval = IndelTable::new("pval", vec!["sgLAD_6hr".to_string()], vec![
            IndelRow::new("R2", 0, vec![Some(0.0)]),
        ]).unwrap();
        assert!(matches!(
            apply_significance_filter(&mut perc, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::default()),
            Err(TableError::KeyMismatch { .. })
        ));
    }
}
