/*!
# tidepath
Turns the percentage and p-value tables from a TIDE-style indel-calling assay into repair-pathway summaries.
The core (`pipeline`) works on in-memory tables; `parsing` and `writers` are the file adapters around it.
*/

/// Sums classified percentages per (condition, replicate, class)
pub mod aggregator;
/// Range-table classification of indel sizes
pub mod classifier;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Relative percentages within a class subset
pub mod normalizer;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Runs the in-memory core from filtered tables to aggregated rows
pub mod pipeline;
/// Wide-to-long reshaping of the percentage table
pub mod reshape;
/// P-value masking of percentages
pub mod significance;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
