/*!
# Pipeline
Runs the in-memory core: significance filter, reshape, classification, aggregation, and optional normalization.
File loading and output writing stay outside of this module.

## Example usage
```rust
use tidepath::data_types::indel_class::IndelClass;
use tidepath::parsing::indel_table::{IndelRow, IndelTable};
use tidepath::pipeline::{run_pipeline, PipelineConfigBuilder};

let conditions = vec!["sgLAD_6hr".to_string()];
let percentages = IndelTable::new("perc", conditions.clone(), vec![
    IndelRow::new("R1", -2, vec![Some(30.0)]),
    IndelRow::new("R1", -10, vec![Some(20.0)]),
    IndelRow::new("R1", 0, vec![Some(50.0)]),
]).unwrap();
let pvalues = IndelTable::new("pval", conditions, vec![
    IndelRow::new("R1", -2, vec![Some(0.0)]),
    IndelRow::new("R1", -10, vec![Some(0.0)]),
    IndelRow::new("R1", 0, vec![Some(0.0)]),
]).unwrap();

let config = PipelineConfigBuilder::default()
    .relative_subset(Some(vec![IndelClass::Nhej, IndelClass::Uncut]))
    .build().unwrap();
let output = run_pipeline(percentages, &pvalues, &config).unwrap();
let relative: Vec<f64> = output.final_records().iter()
    .map(|r| r.relative_percentage.unwrap())
    .collect();
assert_eq!(relative, vec![37.5, 62.5]);
```
*/
use derive_builder::Builder;
use log::{debug, info};

use crate::aggregator::aggregate;
use crate::classifier::ClassificationScheme;
use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::AggregatedRecord;
use crate::normalizer::{normalize, NormalizationReport, ZeroSumPolicy};
use crate::parsing::indel_table::{IndelTable, TableError};
use crate::reshape::melt;
use crate::significance::{apply_significance_filter, FilterReport, MissingPValuePolicy, DEFAULT_PVALUE_THRESHOLD};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("the relative subset must contain at least one class")]
    EmptySubset,
    #[error("subset class {class} is never produced by the classification scheme ({scheme})")]
    SubsetClassNotInScheme { class: IndelClass, scheme: String }
}

/// Controls the core transformation
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct PipelineConfig {
    /// p-values above this are treated as no effect
    pvalue_threshold: f64,
    /// Handling of empty p-value cells
    missing_pvalue_policy: MissingPValuePolicy,
    /// Conditions to keep, in output order; empty keeps all
    conditions: Vec<String>,
    /// The range table used for classification
    scheme: ClassificationScheme,
    /// If true, percentages are truncated to integers before classification
    integer_percentages: bool,
    /// If Some, relative percentages are computed over these classes
    relative_subset: Option<Vec<IndelClass>>,
    /// Handling of groups whose subset sums to 0
    zero_sum_policy: ZeroSumPolicy
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pvalue_threshold: DEFAULT_PVALUE_THRESHOLD,
            missing_pvalue_policy: MissingPValuePolicy::default(),
            conditions: vec![],
            scheme: ClassificationScheme::three_class(),
            integer_percentages: false,
            relative_subset: None,
            zero_sum_policy: ZeroSumPolicy::default()
        }
    }
}

impl PipelineConfig {
    // mostly getters
    pub fn pvalue_threshold(&self) -> f64 {
        self.pvalue_threshold
    }

    pub fn missing_pvalue_policy(&self) -> MissingPValuePolicy {
        self.missing_pvalue_policy
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn scheme(&self) -> &ClassificationScheme {
        &self.scheme
    }

    pub fn integer_percentages(&self) -> bool {
        self.integer_percentages
    }

    pub fn relative_subset(&self) -> Option<&[IndelClass]> {
        self.relative_subset.as_deref()
    }

    pub fn zero_sum_policy(&self) -> ZeroSumPolicy {
        self.zero_sum_policy
    }
}

/// Everything produced by one pipeline run
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Conditions in output order
    conditions: Vec<String>,
    /// Significance filter counts
    filter_report: FilterReport,
    /// Number of long rows before classification
    total_records: usize,
    /// Number of long rows dropped as excluded
    excluded_records: usize,
    /// Summed percentages per (condition, replicate, class)
    aggregated: Vec<AggregatedRecord>,
    /// Relative percentages and the report, if normalization was requested
    normalized: Option<(Vec<AggregatedRecord>, NormalizationReport)>
}

impl PipelineOutput {
    // getters
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn filter_report(&self) -> &FilterReport {
        &self.filter_report
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn excluded_records(&self) -> usize {
        self.excluded_records
    }

    pub fn aggregated(&self) -> &[AggregatedRecord] {
        &self.aggregated
    }

    pub fn normalization_report(&self) -> Option<&NormalizationReport> {
        self.normalized.as_ref().map(|(_, report)| report)
    }

    /// The rows to write and plot: normalized rows if computed, otherwise the summed rows
    pub fn final_records(&self) -> &[AggregatedRecord] {
        match self.normalized.as_ref() {
            Some((records, _)) => records,
            None => &self.aggregated
        }
    }
}

/// Runs the full in-memory transformation.
/// # Arguments
/// * `percentages` - the percentage table, consumed because it is filtered in place
/// * `pvalues` - the aligned p-value table
/// * `config` - pipeline settings
/// # Errors
/// * if the tables are misaligned or a condition is unknown
/// * if a percentage cell is empty or negative, or a p-value is outside [0, 1]
/// * if the relative subset is empty or names a class the scheme never produces
pub fn run_pipeline(
    mut percentages: IndelTable, pvalues: &IndelTable, config: &PipelineConfig
) -> Result<PipelineOutput, PipelineError> {
    if let Some(subset) = config.relative_subset() {
        if subset.is_empty() {
            return Err(PipelineError::EmptySubset);
        }
        let scheme_classes = config.scheme().classes();
        if let Some(&class) = subset.iter().find(|c| !scheme_classes.contains(c)) {
            return Err(PipelineError::SubsetClassNotInScheme { class, scheme: config.scheme().to_string() });
        }
    }

    percentages.require_percentages()?;
    pvalues.require_pvalues()?;

    // filter before anything gets reshaped
    let filter_report = apply_significance_filter(
        &mut percentages, pvalues, config.pvalue_threshold(), config.missing_pvalue_policy()
    )?;
    info!(
        "Significance filter zeroed {} of {} cells ({} missing p-values)",
        filter_report.zeroed_cells, filter_report.total_cells, filter_report.missing_pvalues
    );

    let conditions: Vec<String> = if config.conditions().is_empty() {
        percentages.conditions().to_vec()
    } else {
        config.conditions().to_vec()
    };
    let records = melt(&percentages, &conditions, config.integer_percentages())?;
    let total_records = records.len();

    let (classified, excluded_records) = config.scheme().classify_records(records);
    info!("Classified {} records, excluded {excluded_records}", classified.len());

    let aggregated = aggregate(&classified);
    debug!("Aggregated into {} rows", aggregated.len());

    let normalized = config.relative_subset().map(|subset| {
        let (records, report) = normalize(&aggregated, subset, config.zero_sum_policy());
        info!(
            "Normalized {} rows, {} groups had a zero subset sum",
            records.len(), report.zero_sum_groups.len()
        );
        (records, report)
    });

    Ok(PipelineOutput {
        conditions,
        filter_report,
        total_records,
        excluded_records,
        aggregated,
        normalized
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::indel_table::IndelRow;
    use crate::normalizer::ZeroSumGroup;
    use crate::writers::pathway_plot::{render_pathway_plot, PlotOptions};
    use crate::writers::summary_table::write_summary_to;
    use approx_eq::assert_approx_eq;
    use std::path::PathBuf;

    fn single_condition(rows: &[(i64, f64, Option<f64>)]) -> (IndelTable, IndelTable) {
        let conditions = vec!["sgLAD_6hr".to_string()];
        let perc = rows.iter().map(|&(i, p, _)| IndelRow::new("R1", i, vec![Some(p)])).collect();
        let pval = rows.iter().map(|&(i, _, q)| IndelRow::new("R1", i, vec![q])).collect();
        (
            IndelTable::new("perc", conditions.clone(), perc).unwrap(),
            IndelTable::new("pval", conditions, pval).unwrap()
        )
    }

    #[test]
    fn test_uncut_significant() {
        let (perc, pval) = single_condition(&[(0, 80.0, Some(0.0005))]);
        let output = run_pipeline(perc, &pval, &PipelineConfig::default()).unwrap();
        assert_eq!(output.aggregated(), &[
            AggregatedRecord::new("sgLAD_6hr".to_string(), "R1".to_string(), IndelClass::Uncut, 80.0)
        ]);
    }

    #[test]
    fn test_uncut_not_significant() {
        let (perc, pval) = single_condition(&[(0, 80.0, Some(0.01))]);
        let output = run_pipeline(perc, &pval, &PipelineConfig::default()).unwrap();
        assert_eq!(output.aggregated().len(), 1);
        assert_eq!(output.aggregated()[0].summed_percentage, 0.0);
        assert_eq!(output.filter_report().zeroed_cells, 1);
    }

    #[test]
    fn test_three_class_then_relative() {
        let (perc, pval) = single_condition(&[
            (-2, 30.0, Some(0.0)), (-10, 20.0, Some(0.0)), (0, 50.0, Some(0.0)), (25, 5.0, Some(0.0))
        ]);
        let config = PipelineConfigBuilder::default()
            .relative_subset(Some(vec![IndelClass::Nhej, IndelClass::Uncut]))
            .build().unwrap();
        let output = run_pipeline(perc, &pval, &config).unwrap();
        assert_eq!(output.total_records(), 4);
        assert_eq!(output.excluded_records(), 1);

        let sums: Vec<(IndelClass, f64)> = output.aggregated().iter().map(|r| (r.class, r.summed_percentage)).collect();
        assert_eq!(sums, vec![(IndelClass::Mmej, 20.0), (IndelClass::Nhej, 30.0), (IndelClass::Uncut, 50.0)]);

        let relative = output.final_records();
        assert_eq!(relative.len(), 2);
        assert_approx_eq!(relative[0].relative_percentage.unwrap(), 37.5);
        assert_approx_eq!(relative[1].relative_percentage.unwrap(), 62.5);
        assert_eq!(output.normalization_report().unwrap().out_of_subset_rows, 1);
    }

    #[test]
    fn test_subset_validation() {
        let (perc, pval) = single_condition(&[(0, 80.0, Some(0.0))]);
        let config = PipelineConfigBuilder::default()
            .relative_subset(Some(vec![]))
            .build().unwrap();
        assert!(matches!(run_pipeline(perc.clone(), &pval, &config), Err(PipelineError::EmptySubset)));

        let config = PipelineConfigBuilder::default()
            .scheme(ClassificationScheme::two_class())
            .relative_subset(Some(vec![IndelClass::Mmej, IndelClass::Uncut]))
            .build().unwrap();
        assert!(matches!(
            run_pipeline(perc, &pval, &config),
            Err(PipelineError::SubsetClassNotInScheme { class: IndelClass::Mmej, .. })
        ));
    }

    #[test]
    fn test_example_files() {
        let perc = IndelTable::from_csv(&PathBuf::from("test_data/example_sglad/percentages.csv")).unwrap();
        let pval = IndelTable::from_csv(&PathBuf::from("test_data/example_sglad/pvals.csv")).unwrap();

        // filtered totals per (condition, replicate), computed independently of the pipeline
        let mut filtered = perc.clone();
        apply_significance_filter(&mut filtered, &pval, DEFAULT_PVALUE_THRESHOLD, MissingPValuePolicy::NonSignificant).unwrap();
        let all_records = melt(&filtered, &[], false).unwrap();

        let output = run_pipeline(perc, &pval, &PipelineConfig::default()).unwrap();
        assert_eq!(output.conditions(), &["sgLAD_6hr".to_string(), "sgLAD_24hr".to_string(), "sgLAD_48hr".to_string()]);
        assert!(output.excluded_records() > 0);

        for condition in output.conditions() {
            for replicate in ["R1", "R2"] {
                let filtered_total: f64 = all_records.iter()
                    .filter(|r| &r.condition == condition && r.replicate == replicate)
                    .map(|r| r.percentage)
                    .sum();
                let summed_total: f64 = output.aggregated().iter()
                    .filter(|r| &r.condition == condition && r.replicate == replicate)
                    .map(|r| r.summed_percentage)
                    .sum();
                assert!(summed_total <= filtered_total + 1e-9, "{condition} {replicate}");
            }
        }

        // R1 at 6hr: uncut 61.2, NHEJ -1 (12.4) + 1 (3.1), MMEJ -7 (9.8); the -25 and +5 rows are excluded
        let r1_6hr: Vec<(IndelClass, f64)> = output.aggregated().iter()
            .filter(|r| r.condition == "sgLAD_6hr" && r.replicate == "R1")
            .map(|r| (r.class, r.summed_percentage))
            .collect();
        assert_eq!(r1_6hr.len(), 3);
        assert_eq!(r1_6hr[0].0, IndelClass::Mmej);
        assert_approx_eq!(r1_6hr[0].1, 9.8);
        assert_eq!(r1_6hr[1].0, IndelClass::Nhej);
        assert_approx_eq!(r1_6hr[1].1, 15.5);
        assert_eq!(r1_6hr[2].0, IndelClass::Uncut);
        assert_approx_eq!(r1_6hr[2].1, 61.2);
    }

    fn class_sums(output: &PipelineOutput) -> Vec<(&str, IndelClass, f64)> {
        output.aggregated().iter()
            .map(|r| (r.condition.as_str(), r.class, r.summed_percentage))
            .collect()
    }

    #[test]
    fn test_blank_pvalue_row_policy() {
        let load = || IndelTable::load_pair(
            &PathBuf::from("test_data/blank_pvalue_row/percentages.csv"),
            &PathBuf::from("test_data/blank_pvalue_row/pvals.csv")
        ).unwrap();

        let (perc, pval) = load();
        let config = PipelineConfigBuilder::default()
            .missing_pvalue_policy(MissingPValuePolicy::Significant)
            .build().unwrap();
        let output = run_pipeline(perc, &pval, &config).unwrap();
        assert_eq!(output.filter_report().missing_pvalues, 2);
        assert_eq!(class_sums(&output), vec![
            ("sgLAD_6hr", IndelClass::Nhej, 20.0), ("sgLAD_6hr", IndelClass::Uncut, 80.0),
            ("sgLAD_24hr", IndelClass::Nhej, 30.0), ("sgLAD_24hr", IndelClass::Uncut, 70.0),
        ]);

        let (perc, pval) = load();
        let output = run_pipeline(perc, &pval, &PipelineConfig::default()).unwrap();
        assert_eq!(output.filter_report().zeroed_cells, 2);
        assert_eq!(class_sums(&output), vec![
            ("sgLAD_6hr", IndelClass::Nhej, 0.0), ("sgLAD_6hr", IndelClass::Uncut, 80.0),
            ("sgLAD_24hr", IndelClass::Nhej, 0.0), ("sgLAD_24hr", IndelClass::Uncut, 70.0),
        ]);
    }

    #[test]
    fn test_invalid_values() {
        let (perc, pval) = single_condition(&[(0, -1.0, Some(0.0))]);
        assert!(matches!(
            run_pipeline(perc, &pval, &PipelineConfig::default()),
            Err(PipelineError::Table(TableError::OutOfRange { .. }))
        ));

        let (perc, pval) = single_condition(&[(0, 80.0, Some(1.5))]);
        assert!(matches!(
            run_pipeline(perc, &pval, &PipelineConfig::default()),
            Err(PipelineError::Table(TableError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_relative_example_files() {
        let (perc, pval) = IndelTable::load_pair(
            &PathBuf::from("test_data/relative_h2ax/percentages.csv"),
            &PathBuf::from("test_data/relative_h2ax/pvals.csv")
        ).unwrap();
        let subset = vec![IndelClass::Nhej, IndelClass::Uncut];
        let config = PipelineConfigBuilder::default()
            .scheme(ClassificationScheme::two_class())
            .relative_subset(Some(subset.clone()))
            .build().unwrap();
        let output = run_pipeline(perc, &pval, &config).unwrap();

        // -10 rows are outside the two-class ranges
        assert_eq!(output.excluded_records(), 8);

        // R1 at siH2AX_24hr: the NHEJ -2 row is not significant and the rest are 0
        let report = output.normalization_report().unwrap();
        assert_eq!(report.zero_sum_groups, vec![
            ZeroSumGroup { condition: "siH2AX_24hr".to_string(), replicate: "R1".to_string() }
        ]);
        assert_eq!(report.out_of_subset_rows, 0);

        let records = output.final_records();
        assert_eq!(records.len(), 14);
        assert!(!records.iter().any(|r| r.condition == "siH2AX_24hr" && r.replicate == "R1"));

        // siSCR_6hr R1: NHEJ -2 (18) + 2 (2), uncut 72
        assert_eq!((records[0].condition.as_str(), records[0].replicate.as_str(), records[0].class), ("siSCR_6hr", "R1", IndelClass::Nhej));
        assert_approx_eq!(records[0].relative_percentage.unwrap(), 20.0 / 92.0 * 100.0);
        assert_eq!(records[1].class, IndelClass::Uncut);
        assert_approx_eq!(records[1].relative_percentage.unwrap(), 72.0 / 92.0 * 100.0);

        for condition in output.conditions() {
            for replicate in ["R1", "R2"] {
                let group: Vec<f64> = records.iter()
                    .filter(|r| &r.condition == condition && r.replicate == replicate)
                    .map(|r| r.relative_percentage.unwrap())
                    .collect();
                if !group.is_empty() {
                    assert_approx_eq!(group.iter().sum::<f64>(), 100.0);
                }
            }
        }

        let mut buffer: Vec<u8> = vec![];
        write_summary_to(&mut buffer, b'\t', records).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 15);
        assert!(!text.lines().any(|l| l.starts_with("siH2AX_24hr\tsiH2AX\t24hr\tR1\t")));

        let figure = render_pathway_plot(records, output.conditions(), &subset, &PlotOptions::relative()).to_string();
        assert_eq!(figure.matches("stroke-dasharray").count(), 4);
        assert!(figure.contains("siH2AX | 24hr"));
    }
}
