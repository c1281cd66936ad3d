
use log::{LevelFilter, error, info, warn};
use std::time::Instant;

use tidepath::classifier::ClassificationScheme;
use tidepath::cli::core::{Commands, get_cli};
use tidepath::cli::input::InputSettings;
use tidepath::cli::pathway::{PathwaySettings, check_pathway_settings};
use tidepath::cli::relative::{RelativeSettings, check_relative_settings};
use tidepath::data_types::indel_class::IndelClass;
use tidepath::parsing::indel_table::IndelTable;
use tidepath::pipeline::{PipelineConfig, PipelineConfigBuilder, run_pipeline};
use tidepath::util::json_io::save_json;
use tidepath::writers::pathway_plot::{PlotOptions, render_pathway_plot, save_pathway_plot};
use tidepath::writers::summary_table::write_summary;

/// Sets up logging before we check the other settings
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Creates the output folders and saves the settings into the debug folder, if any
fn prepare_outputs<T: serde::Serialize>(input: &InputSettings, settings: &T) {
    info!("Creating output folder at {:?}...", input.output_folder);
    if let Err(e) = std::fs::create_dir_all(&input.output_folder) {
        error!("Error while creating output folder: {e}");
        std::process::exit(exitcode::IOERR);
    }

    if let Some(debug_folder) = input.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        if let Err(e) = std::fs::create_dir_all(debug_folder) {
            error!("Error while creating debug folder: {e}");
            std::process::exit(exitcode::IOERR);
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Shared load, transform, and write steps
/// # Arguments
/// * `input` - validated shared settings
/// * `config` - the pipeline configuration
/// * `classes` - plotting categories in order
/// * `plot_options` - figure layout
fn run_analysis(input: &InputSettings, config: PipelineConfig, classes: Vec<IndelClass>, plot_options: PlotOptions) {
    info!("Loading indel tables...");
    let (percentages, pvalues) = match IndelTable::load_pair(&input.percentages_fn, &input.pvalues_fn) {
        Ok(tables) => tables,
        Err(e) => {
            error!("Error while loading indel tables: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!(
        "Loaded {} rows across {} conditions",
        percentages.rows().len(), percentages.conditions().len()
    );

    let output = match run_pipeline(percentages, &pvalues, &config) {
        Ok(o) => o,
        Err(e) => {
            error!("Error while summarizing indels: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };

    if let Some(report) = output.normalization_report() {
        for group in report.zero_sum_groups.iter() {
            warn!("Zero subset sum: condition {:?}, replicate {:?}", group.condition, group.replicate);
        }
    }

    let records = output.final_records();
    if records.is_empty() {
        warn!("No rows left after classification, outputs will be empty.");
    }

    let summary_fn = input.summary_path();
    info!("Saving summary table to {summary_fn:?}...");
    if let Err(e) = write_summary(&summary_fn, records) {
        error!("Error while saving summary table: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    let figure_fn = input.figure_path();
    info!("Saving figure to {figure_fn:?}...");
    let document = render_pathway_plot(records, output.conditions(), &classes, &plot_options);
    if let Err(e) = save_pathway_plot(&figure_fn, &document) {
        error!("Error while saving figure: {e:#}");
        std::process::exit(exitcode::IOERR);
    }
}

/// Builds the pipeline config, or exits if the builder rejects it
fn build_config(builder: &mut PipelineConfigBuilder) -> PipelineConfig {
    match builder.build() {
        Ok(pc) => pc,
        Err(e) => {
            error!("Error while building pipeline config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

fn base_builder(input: &InputSettings, scheme: ClassificationScheme) -> PipelineConfigBuilder {
    let mut builder = PipelineConfigBuilder::default();
    builder
        .pvalue_threshold(input.pvalue_threshold)
        .missing_pvalue_policy(input.missing_pvalue)
        .conditions(input.conditions.clone())
        .scheme(scheme)
        .integer_percentages(input.integer_percentages);
    builder
}

fn run_pathway(settings: PathwaySettings) {
    // start the timer
    let start_time = Instant::now();
    init_logging(settings.input.verbosity);

    let settings = match check_pathway_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_outputs(&settings.input, &settings);

    let scheme = settings.input.build_scheme(settings.scheme);
    let mut classes = scheme.classes();
    classes.sort();

    let config = build_config(&mut base_builder(&settings.input, scheme));
    run_analysis(&settings.input, config, classes, PlotOptions::summed());

    info!("Pathway summary completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_relative(settings: RelativeSettings) {
    // start the timer
    let start_time = Instant::now();
    init_logging(settings.input.verbosity);

    let settings = match check_relative_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_outputs(&settings.input, &settings);

    let scheme = settings.input.build_scheme(settings.scheme);
    let config = build_config(
        base_builder(&settings.input, scheme)
            .relative_subset(Some(settings.subset.clone()))
            .zero_sum_policy(settings.zero_sum)
    );
    run_analysis(&settings.input, config, settings.subset.clone(), PlotOptions::relative());

    info!("Relative summary completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Pathway(settings) => {
            run_pathway(*settings);
        },
        Commands::Relative(settings) => {
            run_relative(*settings);
        }
    }

    info!("Process finished successfully.");
}
