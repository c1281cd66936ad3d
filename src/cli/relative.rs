
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;

use crate::classifier::SchemePreset;
use crate::cli::core::{AFTER_HELP, FULL_VERSION};
use crate::cli::input::{check_input_settings, InputSettings};
use crate::data_types::indel_class::IndelClass;
use crate::normalizer::ZeroSumPolicy;

#[derive(Args, Clone, Debug, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct RelativeSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    tidepath_version: String,

    #[clap(flatten)]
    pub input: InputSettings,

    /// Classification preset; individual ranges can be changed with --class-range
    #[clap(value_enum)]
    #[clap(long = "scheme")]
    #[clap(help_heading = Some("Classification"))]
    #[clap(default_value_t = SchemePreset::TwoClass)]
    pub scheme: SchemePreset,

    /// Classes whose sum is the denominator of the relative percentage
    #[clap(long = "subset")]
    #[clap(value_name = "CLASS")]
    #[clap(value_delimiter = ',')]
    #[clap(help_heading = Some("Normalization"))]
    #[clap(default_values_t = vec![IndelClass::Nhej, IndelClass::Uncut])]
    pub subset: Vec<IndelClass>,

    /// Handling of replicates whose subset sums to 0
    #[clap(value_enum)]
    #[clap(long = "zero-sum")]
    #[clap(help_heading = Some("Normalization"))]
    #[clap(default_value_t = ZeroSumPolicy::Skip)]
    pub zero_sum: ZeroSumPolicy,
}

pub fn check_relative_settings(mut settings: RelativeSettings) -> anyhow::Result<RelativeSettings> {
    // hard code the version in
    settings.tidepath_version = FULL_VERSION.clone();
    info!("tidepath version: {:?}", &settings.tidepath_version);
    info!("Sub-command: relative");

    settings.input = check_input_settings(settings.input, "relative.svg")?;

    info!("Classification:");
    let scheme = settings.input.build_scheme(settings.scheme);
    info!("\tScheme: {scheme}");

    info!("Normalization:");
    if settings.subset.is_empty() {
        bail!("--subset must name at least one class");
    }
    if settings.subset.contains(&IndelClass::Excluded) {
        bail!("--subset cannot include excluded indels");
    }
    settings.subset.sort();
    settings.subset.dedup();
    let scheme_classes = scheme.classes();
    if let Some(class) = settings.subset.iter().find(|c| !scheme_classes.contains(c)) {
        bail!("--subset class {class} is not part of the classification scheme ({scheme})");
    }
    info!("\tSubset: {:?}", settings.subset.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    info!("\tZero-sum groups: {}", settings.zero_sum);

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::core::{Cli, Commands};
    use clap::Parser;

    fn parse(extra: &[&str]) -> RelativeSettings {
        let mut args = vec![
            "tidepath", "relative",
            "-p", "test_data/relative_h2ax/percentages.csv",
            "-q", "test_data/relative_h2ax/pvals.csv",
            "-o", "out",
        ];
        args.extend_from_slice(extra);
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Relative(settings) => *settings,
            Commands::Pathway(_) => panic!("expected relative settings")
        }
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.subset, vec![IndelClass::Nhej, IndelClass::Uncut]);
        assert_eq!(settings.scheme, SchemePreset::TwoClass);
        assert_eq!(settings.zero_sum, ZeroSumPolicy::Skip);

        let settings = check_relative_settings(settings).unwrap();
        assert_eq!(settings.input.figure_name, "relative.svg");
    }

    #[test]
    fn test_subset_checks() {
        // MMEJ is not in the two-class scheme
        let settings = parse(&["--subset", "MMEJ,uncut"]);
        assert!(check_relative_settings(settings).is_err());

        // but it is once the scheme includes it
        let settings = parse(&["--subset", "MMEJ,uncut", "--scheme", "three-class"]);
        let settings = check_relative_settings(settings).unwrap();
        assert_eq!(settings.subset, vec![IndelClass::Mmej, IndelClass::Uncut]);

        let settings = parse(&["--subset", "excluded"]);
        assert!(check_relative_settings(settings).is_err());
    }
}
