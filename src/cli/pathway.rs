
use clap::Args;
use log::info;
use serde::Serialize;

use crate::classifier::SchemePreset;
use crate::cli::core::{AFTER_HELP, FULL_VERSION};
use crate::cli::input::{check_input_settings, InputSettings};

#[derive(Args, Clone, Debug, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct PathwaySettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    tidepath_version: String,

    #[clap(flatten)]
    pub input: InputSettings,

    /// Classification preset; individual ranges can be changed with --class-range
    #[clap(value_enum)]
    #[clap(long = "scheme")]
    #[clap(help_heading = Some("Classification"))]
    #[clap(default_value_t = SchemePreset::ThreeClass)]
    pub scheme: SchemePreset,
}

pub fn check_pathway_settings(mut settings: PathwaySettings) -> anyhow::Result<PathwaySettings> {
    // hard code the version in
    settings.tidepath_version = FULL_VERSION.clone();
    info!("tidepath version: {:?}", &settings.tidepath_version);
    info!("Sub-command: pathway");

    settings.input = check_input_settings(settings.input, "pathway.svg")?;

    info!("Classification:");
    info!("\tScheme: {}", settings.input.build_scheme(settings.scheme));

    Ok(settings)
}
