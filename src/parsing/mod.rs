/*!
# Parsing module
Contains the logic for loading the input tables.
*/
/// Wide percentage / p-value tables and their alignment checks
pub mod indel_table;
