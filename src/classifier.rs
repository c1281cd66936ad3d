/*!
# Classifier
Maps indel sizes onto repair-pathway classes using an ordered table of inclusive ranges.
The first range that contains a value wins, so the order of the table is the tie-break for overlapping ranges.
For example, the presets list uncut (`0..=0`) ahead of NHEJ (`-4..=2`), so 0 is always uncut.

## Example usage
```rust
use tidepath::classifier::{ClassificationScheme, ClassRange};
use tidepath::data_types::indel_class::IndelClass;

let scheme = ClassificationScheme::three_class();
assert_eq!(scheme.classify(0), IndelClass::Uncut);
assert_eq!(scheme.classify(-2), IndelClass::Nhej);
assert_eq!(scheme.classify(-10), IndelClass::Mmej);
assert_eq!(scheme.classify(5), IndelClass::Excluded);

// the two-class preset has no MMEJ branch
let scheme = ClassificationScheme::two_class();
assert_eq!(scheme.classify(-10), IndelClass::Excluded);

// ranges can be overridden, e.g. a wider NHEJ window
let range: ClassRange = "NHEJ=-6:3".parse().unwrap();
let scheme = ClassificationScheme::two_class().with_override(range);
assert_eq!(scheme.classify(-6), IndelClass::Nhej);
```
*/
use itertools::Itertools;
use log::trace;
use serde::Serialize;
use std::str::FromStr;

use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::{ClassifiedRecord, IndelRecord};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SchemeError {
    #[error("range for {class} has low {low} > high {high}")]
    InvertedRange { class: IndelClass, low: i64, high: i64 },
    #[error("{class} cannot be assigned a range")]
    ExcludedRange { class: IndelClass },
    #[error("{class} appears more than once in the classification scheme")]
    DuplicateClass { class: IndelClass },
    #[error("could not parse class range {value:?}, expected CLASS=LOW:HIGH")]
    ParseRange { value: String }
}

/// Built-in classification schemes
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SchemePreset {
    /// uncut, NHEJ, and MMEJ
    ThreeClass,
    /// uncut and NHEJ only
    TwoClass
}

/// An inclusive range of indel sizes assigned to one class
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ClassRange {
    /// The class for this range
    class: IndelClass,
    /// Smallest included indel size
    low: i64,
    /// Largest included indel size
    high: i64
}

impl ClassRange {
    /// Constructor
    /// # Errors
    /// * if `low > high`
    /// * if `class` is `Excluded`
    pub fn new(class: IndelClass, low: i64, high: i64) -> Result<Self, SchemeError> {
        if !class.is_retained() {
            return Err(SchemeError::ExcludedRange { class });
        }
        if low > high {
            return Err(SchemeError::InvertedRange { class, low, high });
        }
        Ok(Self { class, low, high })
    }

    // getters
    pub fn class(&self) -> IndelClass {
        self.class
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    /// Returns true if the size is inside this range
    pub fn contains(&self, indel_size: i64) -> bool {
        self.low <= indel_size && indel_size <= self.high
    }
}

impl FromStr for ClassRange {
    type Err = SchemeError;

    /// Parses `CLASS=LOW:HIGH`, e.g. `MMEJ=-20:-3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || SchemeError::ParseRange { value: s.to_string() };
        let (class, bounds) = s.split_once('=').ok_or_else(parse_error)?;
        let (low, high) = bounds.split_once(':').ok_or_else(parse_error)?;
        let class = IndelClass::from_str(class.trim()).map_err(|_| parse_error())?;
        let low = low.trim().parse::<i64>().map_err(|_| parse_error())?;
        let high = high.trim().parse::<i64>().map_err(|_| parse_error())?;
        ClassRange::new(class, low, high)
    }
}

impl std::fmt::Display for ClassRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}:{}", self.class, self.low, self.high)
    }
}

/// Ordered range table, evaluated first match wins
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ClassificationScheme {
    ranges: Vec<ClassRange>
}

impl ClassificationScheme {
    /// Builds a scheme from ranges in priority order.
    /// # Errors
    /// * if a range is inverted or assigned to `Excluded`
    /// * if a class is listed twice
    pub fn new(ranges: Vec<ClassRange>) -> Result<Self, SchemeError> {
        for range in ranges.iter() {
            ClassRange::new(range.class, range.low, range.high)?;
        }
        if let Some(class) = ranges.iter().map(|r| r.class).duplicates().next() {
            return Err(SchemeError::DuplicateClass { class });
        }
        Ok(Self { ranges })
    }

    /// uncut `0`, NHEJ `-4..=2`, MMEJ `-20..=-3`
    pub fn three_class() -> Self {
        Self {
            ranges: vec![
                ClassRange { class: IndelClass::Uncut, low: 0, high: 0 },
                ClassRange { class: IndelClass::Nhej, low: -4, high: 2 },
                ClassRange { class: IndelClass::Mmej, low: -20, high: -3 },
            ]
        }
    }

    /// uncut `0`, NHEJ `-4..=2`
    pub fn two_class() -> Self {
        Self {
            ranges: vec![
                ClassRange { class: IndelClass::Uncut, low: 0, high: 0 },
                ClassRange { class: IndelClass::Nhej, low: -4, high: 2 },
            ]
        }
    }

    /// Returns the scheme for a preset
    pub fn from_preset(preset: SchemePreset) -> Self {
        match preset {
            SchemePreset::ThreeClass => Self::three_class(),
            SchemePreset::TwoClass => Self::two_class()
        }
    }

    /// Replaces the range for `range.class`, keeping its priority.
    /// A class that is not yet present is appended with the lowest priority.
    pub fn with_override(mut self, range: ClassRange) -> Self {
        match self.ranges.iter_mut().find(|r| r.class == range.class) {
            Some(existing) => *existing = range,
            None => self.ranges.push(range)
        };
        self
    }

    pub fn ranges(&self) -> &[ClassRange] {
        &self.ranges
    }

    /// Classes this scheme can emit, in priority order
    pub fn classes(&self) -> Vec<IndelClass> {
        self.ranges.iter().map(|r| r.class).collect()
    }

    /// Classifies a single indel size
    pub fn classify(&self, indel_size: i64) -> IndelClass {
        self.ranges.iter()
            .find(|r| r.contains(indel_size))
            .map(|r| r.class)
            .unwrap_or(IndelClass::Excluded)
    }

    /// Classifies every record and drops the excluded ones.
    /// Returns the retained records and the number dropped.
    pub fn classify_records(&self, records: Vec<IndelRecord>) -> (Vec<ClassifiedRecord>, usize) {
        let total = records.len();
        let classified: Vec<ClassifiedRecord> = records.into_iter()
            .filter_map(|record| {
                let class = self.classify(record.indel_size);
                if class.is_retained() {
                    Some(ClassifiedRecord { record, class })
                } else {
                    trace!("Excluding indel {} in {} / {}", record.indel_size, record.condition, record.replicate);
                    None
                }
            })
            .collect();
        let dropped = total - classified.len();
        (classified, dropped)
    }
}

impl std::fmt::Display for ClassificationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ranges.iter().join(", "))
    }
}
