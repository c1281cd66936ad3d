
use crate::data_types::records::IndelRecord;
use crate::parsing::indel_table::{IndelTable, TableError};

/// Converts the wide table into long records, one per replicate × condition × indel size.
/// Records are emitted condition by condition, in the order of `conditions`.
/// # Arguments
/// * `table` - the filtered percentage table
/// * `conditions` - the condition columns to keep; empty means all columns in file order
/// * `integer_percentages` - if true, percentages are truncated toward zero
/// # Errors
/// * if a requested condition is missing from the table
/// * if a kept cell is empty
pub fn melt(table: &IndelTable, conditions: &[String], integer_percentages: bool) -> Result<Vec<IndelRecord>, TableError> {
    let selected: Vec<String> = if conditions.is_empty() {
        table.conditions().to_vec()
    } else {
        conditions.to_vec()
    };

    let mut records = Vec::with_capacity(selected.len() * table.rows().len());
    for condition in selected.iter() {
        let column = table.condition_index(condition)?;
        for row in table.rows().iter() {
            let value = row.values[column].ok_or_else(|| TableError::MissingPercentage {
                label: table.label().to_string(), line: row.line, condition: condition.clone()
            })?;
            let percentage = if integer_percentages { value.trunc() } else { value };
            records.push(IndelRecord {
                replicate: row.replicate.clone(),
                indel_size: row.indel_size,
                condition: condition.clone(),
                percentage
            });
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::indel_table::IndelRow;

    fn table() -> IndelTable {
        IndelTable::new("perc", vec!["a_6hr".to_string(), "a_24hr".to_string()], vec![
            IndelRow::new("R1", 0, vec![Some(50.7), Some(40.0)]),
            IndelRow::new("R1", -2, vec![Some(30.0), Some(20.2)]),
        ]).unwrap()
    }

    #[test]
    fn test_melt_all() {
        let records = melt(&table(), &[], false).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], IndelRecord { replicate: "R1".to_string(), indel_size: 0, condition: "a_6hr".to_string(), percentage: 50.7 });
        assert_eq!(records[3], IndelRecord { replicate: "R1".to_string(), indel_size: -2, condition: "a_24hr".to_string(), percentage: 20.2 });
    }

    #[test]
    fn test_melt_selected() {
        let records = melt(&table(), &["a_24hr".to_string()], true).unwrap();
        let values: Vec<f64> = records.iter().map(|r| r.percentage).collect();
        assert_eq!(values, vec![40.0, 20.0]);
        assert!(records.iter().all(|r| r.condition == "a_24hr"));

        assert!(matches!(melt(&table(), &["a_48hr".to_string()], false), Err(TableError::UnknownCondition { .. })));
    }

    #[test]
    fn test_melt_missing() {
        let table = IndelTable::new("perc", vec!["a_6hr".to_string()], vec![
            IndelRow::new("R1", 0, vec![None]),
        ]).unwrap();
        assert!(matches!(melt(&table, &[], false), Err(TableError::MissingPercentage { .. })));
    }
}
