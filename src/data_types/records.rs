
use crate::data_types::indel_class::IndelClass;

/// One long-format row: a single replicate, condition, and indel size
#[derive(Clone, Debug, PartialEq)]
pub struct IndelRecord {
    /// Replicate identifier, taken verbatim from the first column
    pub replicate: String,
    /// Signed indel size in bp
    pub indel_size: i64,
    /// Condition label, i.e. the source column header
    pub condition: String,
    /// Filtered percentage of reads with this indel
    pub percentage: f64
}

/// An `IndelRecord` with its assigned repair class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRecord {
    /// The underlying record
    pub record: IndelRecord,
    /// The class assigned by the classification scheme
    pub class: IndelClass
}

/// Summed percentages for one (condition, replicate, class) triple
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedRecord {
    /// Condition label
    pub condition: String,
    /// Replicate identifier
    pub replicate: String,
    /// Repair class, never `Excluded`
    pub class: IndelClass,
    /// Sum of filtered percentages in this group
    pub summed_percentage: f64,
    /// Percentage within the chosen class subset, if normalization was run
    pub relative_percentage: Option<f64>
}

impl AggregatedRecord {
    /// Constructor for a record that has not been normalized
    pub fn new(condition: String, replicate: String, class: IndelClass, summed_percentage: f64) -> Self {
        Self {
            condition,
            replicate,
            class,
            summed_percentage,
            relative_percentage: None
        }
    }

    /// The value that gets plotted: relative if available, otherwise the raw sum
    pub fn plot_value(&self) -> f64 {
        self.relative_percentage.unwrap_or(self.summed_percentage)
    }
}

/// Splits a condition such as `siSCR_6hr` into the group and timepoint around the first `_`.
/// Conditions without an underscore have no timepoint.
pub fn split_condition(condition: &str) -> (&str, Option<&str>) {
    match condition.split_once('_') {
        Some((group, timepoint)) => (group, Some(timepoint)),
        None => (condition, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_condition() {
        assert_eq!(split_condition("siSCR_6hr"), ("siSCR", Some("6hr")));
        assert_eq!(split_condition("sgLAD_24hr"), ("sgLAD", Some("24hr")));
        // only the first underscore splits
        assert_eq!(split_condition("ATMi_dose_48hr"), ("ATMi", Some("dose_48hr")));
        assert_eq!(split_condition("control"), ("control", None));
    }

    #[test]
    fn test_plot_value() {
        let mut record = AggregatedRecord::new("a_1".to_string(), "r1".to_string(), IndelClass::Nhej, 30.0);
        assert_eq!(record.plot_value(), 30.0);
        record.relative_percentage = Some(37.5);
        assert_eq!(record.plot_value(), 37.5);
    }
}
