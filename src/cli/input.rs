
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::classifier::{ClassRange, ClassificationScheme, SchemePreset};
use crate::cli::core::check_required_filename;
use crate::significance::{MissingPValuePolicy, DEFAULT_PVALUE_THRESHOLD};

/// Options shared by every sub-command
#[derive(Args, Clone, Debug, Serialize)]
pub struct InputSettings {
    /// Indel percentage table (CSV)
    #[clap(required = true)]
    #[clap(short = 'p')]
    #[clap(long = "percentages")]
    #[clap(value_name = "CSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub percentages_fn: PathBuf,

    /// Indel p-value table (CSV), row-aligned with the percentages
    #[clap(required = true)]
    #[clap(short = 'q')]
    #[clap(long = "pvalues")]
    #[clap(value_name = "CSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pvalues_fn: PathBuf,

    /// Output directory for the figure and summary table
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Figure file name inside the output directory [default: <subcommand>.svg]
    #[clap(long = "figure-name")]
    #[clap(value_name = "SVG")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub figure_name: String,

    /// Summary table file name inside the output directory; ".csv" switches to comma delimiters
    #[clap(long = "summary-name")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "summary.tsv")]
    pub summary_name: String,

    /// Conditions to include, in plotting order [default: all columns]
    #[clap(short = 'c')]
    #[clap(long = "conditions")]
    #[clap(value_name = "NAME")]
    #[clap(value_delimiter = ',')]
    #[clap(help_heading = Some("Filtering"))]
    pub conditions: Vec<String>,

    /// Percentages with a p-value above this are set to 0
    #[clap(long = "threshold")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Filtering"))]
    #[clap(default_value_t = DEFAULT_PVALUE_THRESHOLD)]
    pub pvalue_threshold: f64,

    /// Handling of percentages whose p-value cell is empty
    #[clap(value_enum)]
    #[clap(long = "missing-pvalue")]
    #[clap(help_heading = Some("Filtering"))]
    #[clap(default_value_t = MissingPValuePolicy::NonSignificant)]
    pub missing_pvalue: MissingPValuePolicy,

    /// Truncates percentages to whole numbers before summing
    #[clap(long = "integer-percentages")]
    #[clap(help_heading = Some("Filtering"))]
    pub integer_percentages: bool,

    /// Overrides one class range of the scheme, e.g. "NHEJ=-4:2"; may be repeated
    #[clap(long = "class-range")]
    #[clap(value_name = "CLASS=LOW:HIGH")]
    #[clap(help_heading = Some("Classification"))]
    pub class_ranges: Vec<ClassRange>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl InputSettings {
    /// Path of the summary table
    pub fn summary_path(&self) -> PathBuf {
        self.output_folder.join(&self.summary_name)
    }

    /// Path of the rendered figure
    pub fn figure_path(&self) -> PathBuf {
        self.output_folder.join(&self.figure_name)
    }

    /// Builds the classification scheme from a preset plus any overrides
    pub fn build_scheme(&self, preset: SchemePreset) -> ClassificationScheme {
        self.class_ranges.iter()
            .fold(ClassificationScheme::from_preset(preset), |scheme, &range| scheme.with_override(range))
    }
}

/// Validates and logs the shared options
/// # Arguments
/// * `settings` - the parsed options
/// * `default_figure` - figure name used when none was given
/// # Errors
/// * if an input file is missing
/// * if the threshold is outside [0, 1]
/// * if a condition is listed twice
pub fn check_input_settings(mut settings: InputSettings, default_figure: &str) -> anyhow::Result<InputSettings> {
    info!("Inputs:");
    check_required_filename(&settings.percentages_fn, "Percentage table")?;
    check_required_filename(&settings.pvalues_fn, "P-value table")?;
    info!("\tPercentages: {:?}", &settings.percentages_fn);
    info!("\tP-values: {:?}", &settings.pvalues_fn);

    info!("Filtering:");
    if !(0.0..=1.0).contains(&settings.pvalue_threshold) {
        bail!("--threshold must be in [0, 1], got {}", settings.pvalue_threshold);
    }
    info!("\tP-value threshold: {}", settings.pvalue_threshold);
    info!("\tMissing p-values: {}", settings.missing_pvalue);
    info!("\tInteger percentages: {}", if settings.integer_percentages { "ENABLED" } else { "DISABLED" });
    if settings.conditions.is_empty() {
        info!("\tConditions: all");
    } else {
        for (i, condition) in settings.conditions.iter().enumerate() {
            if settings.conditions[..i].contains(condition) {
                bail!("Condition listed more than once: {condition:?}");
            }
        }
        info!("\tConditions: {:?}", &settings.conditions);
    }

    if settings.figure_name.is_empty() {
        settings.figure_name = default_figure.to_string();
    }
    if settings.summary_name.is_empty() {
        bail!("--summary-name must not be empty");
    }

    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);
    info!("\tFigure: {:?}", settings.figure_path());
    info!("\tSummary: {:?}", settings.summary_path());
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    Ok(settings)
}
