
use serde::Serialize;
use std::path::Path;

use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::{split_condition, AggregatedRecord};

/// Header of the summary file, in `SummaryRow` field order
const SUMMARY_COLUMNS: [&str; 7] = [
    "condition", "condition_group", "timepoint", "replicate",
    "class", "summed_percentage", "relative_percentage"
];

/// Contains all the data written to each row of the summary file
#[derive(Serialize)]
struct SummaryRow<'a> {
    /// Full condition label
    condition: &'a str,
    /// Condition label before the first `_`
    condition_group: &'a str,
    /// Condition label after the first `_`, empty if there is none
    timepoint: &'a str,
    /// Replicate identifier
    replicate: &'a str,
    /// Repair class
    class: IndelClass,
    /// Summed filtered percentage
    summed_percentage: f64,
    /// Relative percentage within the class subset, empty if not computed
    relative_percentage: Option<f64>
}

impl<'a> SummaryRow<'a> {
    /// Creates a new row from an aggregated record
    fn new(record: &'a AggregatedRecord) -> Self {
        let (condition_group, timepoint) = split_condition(&record.condition);
        Self {
            condition: &record.condition,
            condition_group,
            timepoint: timepoint.unwrap_or_default(),
            replicate: &record.replicate,
            class: record.class,
            summed_percentage: record.summed_percentage,
            relative_percentage: record.relative_percentage
        }
    }
}

/// Picks the delimiter from the output extension: "," for .csv, tab otherwise
fn delimiter_for(filename: &Path) -> u8 {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    if is_csv { b',' } else { b'\t' }
}

/// Writes aggregated rows to any writer with the given delimiter.
/// The header is always written, even without any rows.
/// # Arguments
/// * `writer` - the output handle
/// * `delimiter` - field delimiter
/// * `records` - rows to write, in order
pub fn write_summary_to<W: std::io::Write>(writer: W, delimiter: u8, records: &[AggregatedRecord]) -> csv::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(SUMMARY_COLUMNS)?;
    for record in records.iter() {
        csv_writer.serialize(SummaryRow::new(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Will write the summary out to the given file path
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `records` - rows to write, in order
pub fn write_summary(filename: &Path, records: &[AggregatedRecord]) -> csv::Result<()> {
    let file = std::fs::File::create(filename)?;
    write_summary_to(file, delimiter_for(filename), records)
}
