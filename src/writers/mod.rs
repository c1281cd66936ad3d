/*!
# Writers module
Contains the logic for writing the output files for each sub-command.
*/
/// Renders the faceted bar and strip plot as SVG
pub mod pathway_plot;
/// Writes the aggregated summary table
pub mod summary_table;
