/*!
# CLI module
Command line interface functionality that is specific to tidepath.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// Input, output, and filter options shared by every sub-command
pub mod input;
/// The pathway CLI subcommand
pub mod pathway;
/// The relative CLI subcommand
pub mod relative;
