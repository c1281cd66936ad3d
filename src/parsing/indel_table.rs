
use log::{debug, warn};
use std::io::Read;
use std::path::Path;

/// Errors while loading or aligning the wide indel tables
#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("error while reading {label}: {error}")]
    Csv { label: String, #[source] error: csv::Error },
    #[error("{label} has {found} columns; expected replicate, indel, and at least one condition")]
    MissingColumns { label: String, found: usize },
    #[error("{label} has a blank condition header in column {column}")]
    BlankCondition { label: String, column: usize },
    #[error("{label} has duplicate condition column {condition:?}")]
    DuplicateCondition { label: String, condition: String },
    #[error("{label} line {line}: indel size {value:?} is not an integer")]
    InvalidIndel { label: String, line: u64, value: String },
    #[error("{label} line {line}, column {condition:?}: value {value:?} is not a finite number")]
    InvalidValue { label: String, line: u64, condition: String, value: String },
    #[error("{label} line {line}: expected {expected} values, found {found}")]
    RowWidth { label: String, line: u64, expected: usize, found: usize },
    #[error("{label} line {line}, column {condition:?}: percentage is missing")]
    MissingPercentage { label: String, line: u64, condition: String },
    #[error("condition columns differ: {left_label} has {left:?}, {right_label} has {right:?}")]
    ConditionMismatch { left_label: String, left: Vec<String>, right_label: String, right: Vec<String> },
    #[error("row counts differ: {left_label} has {left} rows, {right_label} has {right} rows")]
    RowCountMismatch { left_label: String, left: usize, right_label: String, right: usize },
    #[error("row {index} is misaligned: {left_label} has ({left_replicate}, {left_indel}), {right_label} has ({right_replicate}, {right_indel})")]
    KeyMismatch {
        index: usize,
        left_label: String, left_replicate: String, left_indel: i64,
        right_label: String, right_replicate: String, right_indel: i64
    },
    #[error("condition {condition:?} is not present in {label}")]
    UnknownCondition { label: String, condition: String },
    #[error("{label} line {line}, column {condition:?}: value {value} is outside [{min}, {max}]")]
    OutOfRange { label: String, line: u64, condition: String, value: f64, min: f64, max: f64 }
}

/// One row of a wide indel table
#[derive(Clone, Debug, PartialEq)]
pub struct IndelRow {
    /// Replicate identifier from the first column
    pub replicate: String,
    /// Indel size from the second column
    pub indel_size: i64,
    /// One value per condition, `None` for empty cells
    pub values: Vec<Option<f64>>,
    /// 1-based source line, 0 when built in memory
    pub line: u64
}

impl IndelRow {
    /// Constructor for in-memory rows
    pub fn new(replicate: &str, indel_size: i64, values: Vec<Option<f64>>) -> Self {
        Self {
            replicate: replicate.to_string(),
            indel_size,
            values,
            line: 0
        }
    }
}

/// Wide table with one column per condition, as exported by the indel caller.
/// The first two columns of the source file are always the replicate and indel size, whatever their headers say.
#[derive(Clone, Debug, PartialEq)]
pub struct IndelTable {
    /// Label used in error messages, usually the file path
    label: String,
    /// Condition headers in file order
    conditions: Vec<String>,
    /// Retained rows in file order
    rows: Vec<IndelRow>
}

impl IndelTable {
    /// Builds a table from in-memory rows.
    /// # Errors
    /// * if there are no conditions, or a condition is blank or duplicated
    /// * if any row does not have exactly one value per condition
    pub fn new(label: &str, conditions: Vec<String>, rows: Vec<IndelRow>) -> Result<Self, TableError> {
        if conditions.is_empty() {
            return Err(TableError::MissingColumns { label: label.to_string(), found: 2 });
        }
        let mut seen = std::collections::HashSet::new();
        for (i, condition) in conditions.iter().enumerate() {
            if condition.is_empty() {
                return Err(TableError::BlankCondition { label: label.to_string(), column: i + 3 });
            }
            if !seen.insert(condition.as_str()) {
                return Err(TableError::DuplicateCondition { label: label.to_string(), condition: condition.clone() });
            }
        }
        for row in rows.iter() {
            if row.values.len() != conditions.len() {
                return Err(TableError::RowWidth {
                    label: label.to_string(), line: row.line,
                    expected: conditions.len(), found: row.values.len()
                });
            }
        }

        Ok(Self {
            label: label.to_string(),
            conditions,
            rows
        })
    }

    /// Opens a CSV file and parses it into a table.
    /// # Errors
    /// * if the file cannot be opened or parsed, see `from_reader`
    pub fn from_csv(filename: &Path) -> Result<Self, TableError> {
        let label = format!("{}", filename.display());
        let file = std::fs::File::open(filename)
            .map_err(|e| TableError::Csv { label: label.clone(), error: e.into() })?;
        Self::from_reader(file, &label)
    }

    /// Parses CSV content into a table.
    /// Rows where every condition cell is empty are dropped, as are rows without a replicate or indel value.
    /// # Arguments
    /// * `reader` - the CSV source, header row required
    /// * `label` - name used in error messages
    /// # Errors
    /// * if the CSV is malformed or has fewer than three columns
    /// * if an indel cell is not an integer or a value cell is not a finite number
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, TableError> {
        let mut table = Self::read_rows(reader, label)?;
        let dropped = table.drop_empty_rows();
        debug!("{label}: dropped {dropped} rows without values");
        Ok(table)
    }

    /// Same as `from_csv`, but rows without any values are kept
    fn from_csv_keep_empty(filename: &Path) -> Result<Self, TableError> {
        let label = format!("{}", filename.display());
        let file = std::fs::File::open(filename)
            .map_err(|e| TableError::Csv { label: label.clone(), error: e.into() })?;
        Self::read_rows(file, &label)
    }

    /// Parses every keyed row; only rows without a replicate or indel value are skipped
    fn read_rows<R: Read>(reader: R, label: &str) -> Result<Self, TableError> {
        let csv_error = |error: csv::Error| TableError::Csv { label: label.to_string(), error };
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers().map_err(csv_error)?.clone();
        if headers.len() < 3 {
            return Err(TableError::MissingColumns { label: label.to_string(), found: headers.len() });
        }
        let conditions: Vec<String> = headers.iter().skip(2).map(|h| h.to_string()).collect();

        let mut rows = vec![];
        let mut dropped = 0;
        for result in csv_reader.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let values: Vec<Option<f64>> = record.iter().skip(2)
                .zip(conditions.iter())
                .map(|(cell, condition)| {
                    parse_value(cell).ok_or_else(|| TableError::InvalidValue {
                        label: label.to_string(), line,
                        condition: condition.clone(), value: cell.to_string()
                    })
                })
                .collect::<Result<_, _>>()?;

            let replicate = record.get(0).unwrap_or_default();
            let indel_cell = record.get(1).unwrap_or_default();
            if replicate.is_empty() || indel_cell.is_empty() {
                if values.iter().any(|v| v.is_some()) {
                    warn!("{label} line {line}: dropping row without a replicate or indel size");
                } else {
                    debug!("{label} line {line}: dropping blank row");
                }
                dropped += 1;
                continue;
            }

            let indel_size = parse_indel(indel_cell).ok_or_else(|| TableError::InvalidIndel {
                label: label.to_string(), line, value: indel_cell.to_string()
            })?;
            rows.push(IndelRow {
                replicate: replicate.to_string(),
                indel_size,
                values,
                line
            });
        }

        debug!("{label}: loaded {} rows, skipped {dropped} blank rows", rows.len());
        Self::new(label, conditions, rows)
    }

    /// Loads a percentage table and its p-value table, then verifies they line up.
    /// Rows without any percentage are dropped from both tables.
    /// P-value rows without any value are kept, so their cells go through the missing p-value handling.
    /// # Errors
    /// * if either file fails to load
    /// * if the tables are not aligned
    /// * if a percentage cell is empty or negative, or a p-value is outside [0, 1]
    pub fn load_pair(percentages_fn: &Path, pvalues_fn: &Path) -> Result<(IndelTable, IndelTable), TableError> {
        let mut percentages = Self::from_csv_keep_empty(percentages_fn)?;
        let mut pvalues = Self::from_csv_keep_empty(pvalues_fn)?;
        percentages.check_alignment(&pvalues)?;

        let keep: Vec<bool> = percentages.rows.iter()
            .map(|row| row.values.iter().any(|v| v.is_some()))
            .collect();
        let mut index = 0;
        pvalues.rows.retain(|_| {
            index += 1;
            keep[index - 1]
        });
        let dropped = percentages.drop_empty_rows();
        debug!("{}: dropped {dropped} rows without percentages", percentages.label);

        percentages.require_percentages()?;
        pvalues.require_pvalues()?;
        Ok((percentages, pvalues))
    }

    /// Removes rows where every condition cell is empty, returning how many were removed
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.values.iter().any(|v| v.is_some()));
        before - self.rows.len()
    }

    // getters
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn rows(&self) -> &[IndelRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [IndelRow] {
        &mut self.rows
    }

    /// Returns the column index of a condition
    /// # Errors
    /// * if the condition is not in this table
    pub fn condition_index(&self, condition: &str) -> Result<usize, TableError> {
        self.conditions.iter()
            .position(|c| c == condition)
            .ok_or_else(|| TableError::UnknownCondition { label: self.label.clone(), condition: condition.to_string() })
    }

    /// Verifies that every cell has a value, which is required for percentage tables.
    /// # Errors
    /// * on the first empty cell found
    pub fn require_complete(&self) -> Result<(), TableError> {
        for row in self.rows.iter() {
            if let Some(i) = row.values.iter().position(|v| v.is_none()) {
                return Err(TableError::MissingPercentage {
                    label: self.label.clone(), line: row.line, condition: self.conditions[i].clone()
                });
            }
        }
        Ok(())
    }

    /// Verifies that every present value lies within `[min, max]`.
    /// # Errors
    /// * on the first value outside the range
    pub fn require_range(&self, min: f64, max: f64) -> Result<(), TableError> {
        for row in self.rows.iter() {
            for (i, value) in row.values.iter().enumerate() {
                if let Some(v) = *value {
                    if v < min || v > max {
                        return Err(TableError::OutOfRange {
                            label: self.label.clone(), line: row.line,
                            condition: self.conditions[i].clone(), value: v, min, max
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Percentage tables must be complete and non-negative
    /// # Errors
    /// * if a cell is empty or negative
    pub fn require_percentages(&self) -> Result<(), TableError> {
        self.require_complete()?;
        self.require_range(0.0, f64::INFINITY)
    }

    /// P-value tables may have empty cells, but present values must be probabilities
    /// # Errors
    /// * if a value is outside [0, 1]
    pub fn require_pvalues(&self) -> Result<(), TableError> {
        self.require_range(0.0, 1.0)
    }

    /// Checks that `other` has the same conditions, row count, and (replicate, indel) keys in the same order.
    /// Nothing is broadcast or truncated; any difference is an error.
    /// # Errors
    /// * if the conditions, the row counts, or any row key differ
    pub fn check_alignment(&self, other: &IndelTable) -> Result<(), TableError> {
        if self.conditions != other.conditions {
            return Err(TableError::ConditionMismatch {
                left_label: self.label.clone(), left: self.conditions.clone(),
                right_label: other.label.clone(), right: other.conditions.clone()
            });
        }
        if self.rows.len() != other.rows.len() {
            return Err(TableError::RowCountMismatch {
                left_label: self.label.clone(), left: self.rows.len(),
                right_label: other.label.clone(), right: other.rows.len()
            });
        }
        for (index, (left, right)) in self.rows.iter().zip(other.rows.iter()).enumerate() {
            if left.replicate != right.replicate || left.indel_size != right.indel_size {
                return Err(TableError::KeyMismatch {
                    index,
                    left_label: self.label.clone(), left_replicate: left.replicate.clone(), left_indel: left.indel_size,
                    right_label: other.label.clone(), right_replicate: right.replicate.clone(), right_indel: right.indel_size
                });
            }
        }
        Ok(())
    }
}

/// Parses a value cell; outer `None` is a parse failure, inner `None` is an empty cell.
fn parse_value(cell: &str) -> Option<Option<f64>> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("na") {
        return Some(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Some(v)),
        _ => None
    }
}

/// Parses an indel size, allowing float formatting of whole numbers such as `-3.0`
fn parse_indel(cell: &str) -> Option<i64> {
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(v as i64),
        _ => None
    }
}
