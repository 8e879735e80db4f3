//! Value cleaning.
//!
//! Cleaning is lenient on purpose: [`clean_numeric_column`] never fails,
//! it logs and hands the table back untouched. [`ensure_numeric_column`]
//! is the strict counterpart run before normalization.

use std::collections::HashSet;
use tracing::{error, info};

use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::table::{row_key, row_key_numeric, Table, Value};

/// What a successful numeric clean did to the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub negative_rows_dropped: usize,
    pub missing_values_filled: usize,
}

/// Coerce `column` to numbers, drop rows where it is negative and fill
/// missing or non-numeric cells with zero. On failure the error is logged
/// and the input comes back unchanged.
pub fn clean_numeric_column(mut table: Table, column: &str) -> Table {
    match coerce_numeric(&mut table, column) {
        Ok(stats) => {
            metrics::clean::negative_rows_dropped(stats.negative_rows_dropped);
            metrics::clean::missing_values_filled(stats.missing_values_filled);
            info!(
                column,
                negative_rows_dropped = stats.negative_rows_dropped,
                missing_values_filled = stats.missing_values_filled,
                "Column cleaned"
            );
        }
        Err(e) => {
            metrics::clean::failure();
            error!(column, "Error cleaning column: {}", e);
        }
    }
    table
}

fn coerce_numeric(table: &mut Table, column: &str) -> Result<CleaningStats> {
    // Every failure must happen before the first mutation.
    let idx = table.column_index(column).ok_or_else(|| EtlError::Cleaning {
        column: column.to_string(),
        reason: "column not present".to_string(),
    })?;

    table.map_column(column, |v| v.as_f64().map(Value::Float).unwrap_or(Value::Null))?;

    let before = table.len();
    table.retain_rows(|row| !matches!(row[idx], Value::Float(v) if v < 0.0));
    let negative_rows_dropped = before - table.len();

    let mut missing_values_filled = 0;
    table.map_column(column, |v| {
        if v.is_null() {
            missing_values_filled += 1;
            Value::Float(0.0)
        } else {
            v.clone()
        }
    })?;

    Ok(CleaningStats {
        negative_rows_dropped,
        missing_values_filled,
    })
}

/// Drop rows identical to an earlier row across all columns, keeping the first
pub fn remove_duplicates(table: Table) -> Table {
    remove_duplicates_numeric(table, &[])
}

/// [`remove_duplicates`], comparing `numeric_columns` by parsed value rather
/// than by text. Cells in those columns that do not parse compare as text.
/// Unknown column names are ignored.
pub fn remove_duplicates_numeric(mut table: Table, numeric_columns: &[&str]) -> Table {
    let initial = table.len();
    let numeric: Vec<usize> = numeric_columns
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();

    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        table
            .rows()
            .iter()
            .map(|row| {
                let key = if numeric.is_empty() {
                    row_key(row)
                } else {
                    row_key_numeric(row, &numeric)
                };
                seen.insert(key)
            })
            .collect()
    };
    let mut keep = keep.into_iter();
    table.retain_rows(|_| keep.next().unwrap_or(true));

    let removed = initial - table.len();
    if removed > 0 {
        metrics::clean::duplicates_removed(removed);
        info!("Removed {} duplicate rows", removed);
    }
    table
}

/// Check that every cell of `column` is a finite, non-negative number
pub fn ensure_numeric_column(table: &Table, column: &str) -> Result<()> {
    let cells = table.column(column).ok_or_else(|| EtlError::UncleanData {
        column: column.to_string(),
        row: 0,
        value: "<column missing>".to_string(),
    })?;

    for (row, cell) in cells.into_iter().enumerate() {
        let ok = matches!(cell, Value::Float(v) if v.is_finite() && *v >= 0.0)
            || matches!(cell, Value::Int(v) if *v >= 0);
        if !ok {
            return Err(EtlError::UncleanData {
                column: column.to_string(),
                row,
                value: format!("{:?}", cell),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(values: Vec<Value>) -> Table {
        Table::from_rows(
            vec!["value".to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_clean_numeric_column_drops_negatives_and_fills_missing() {
        let table = single_column(vec![
            Value::from("1.0"),
            Value::from("-1.0"),
            Value::from("invalid"),
            Value::from("3.0"),
            Value::Null,
        ]);

        let cleaned = clean_numeric_column(table, "value");
        let values: Vec<f64> = cleaned
            .column("value")
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();

        assert_eq!(values, vec![1.0, 0.0, 3.0, 0.0]);
        assert!(ensure_numeric_column(&cleaned, "value").is_ok());
    }

    #[test]
    fn test_clean_numeric_column_returns_input_on_missing_column() {
        let table = single_column(vec![Value::from("-5")]);
        let cleaned = clean_numeric_column(table.clone(), "Value");
        assert_eq!(cleaned, table);
    }

    #[test]
    fn test_negative_zero_is_kept() {
        let cleaned = clean_numeric_column(single_column(vec![Value::from("-0.0")]), "value");
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence() {
        let columns = vec!["col1".to_string(), "col2".to_string()];
        let table = Table::from_rows(
            columns,
            vec![
                vec!["1".into(), "a".into()],
                vec!["1".into(), "a".into()],
                vec!["2".into(), "b".into()],
                vec!["3".into(), "c".into()],
                vec!["2".into(), "b".into()],
            ],
        )
        .unwrap();

        let deduped = remove_duplicates(table);
        assert_eq!(deduped.len(), 3);
        let firsts: Vec<_> = deduped.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(firsts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_rows_differing_only_in_decimals_are_not_duplicates() {
        let table = single_column(vec![Value::from("188.554"), Value::from("188.6")]);
        assert_eq!(remove_duplicates(table).len(), 2);
    }

    #[test]
    fn test_ensure_numeric_column_flags_text_cells() {
        let table = single_column(vec![Value::Float(1.0), Value::from("oops")]);
        let err = ensure_numeric_column(&table, "value").unwrap_err();
        assert!(matches!(err, EtlError::UncleanData { row: 1, .. }));
    }

    #[test]
    fn test_numeric_duplicates_compare_by_value() {
        let columns = vec!["label".to_string(), "Value".to_string()];
        let rows = vec![
            vec![Value::from("ICSE93_T"), Value::from("188.5")],
            vec![Value::from("ICSE93_T"), Value::from("188.50")],
            vec![Value::from("ICSE93_1"), Value::from("188.5")],
            vec![Value::from("ICSE93_T"), Value::from("0")],
            vec![Value::from("ICSE93_T"), Value::from("-0.0")],
            vec![Value::from("ICSE93_T"), Value::from("n/a")],
            vec![Value::from("ICSE93_T"), Value::from("N/A")],
        ];
        let table = Table::from_rows(columns, rows).unwrap();

        assert_eq!(remove_duplicates(table.clone()).len(), 7);
        let deduped = remove_duplicates_numeric(table, &["Value"]);
        let values: Vec<_> = deduped.rows().iter().map(|r| r[1].to_string()).collect();
        assert_eq!(values, vec!["188.5", "188.5", "0", "n/a", "N/A"]);
    }

    /// Two-column table drawn from a fixed pool of label and value cells,
    /// with repeats, negatives, blanks and text that only equals by value
    fn generated_table(seed: u64, rows: usize) -> Table {
        const LABELS: [&str; 3] = ["ICSE93_T", "ICSE93_1", "ISCO88_2"];
        const VALUES: [&str; 11] = [
            "188.5", "188.50", " 188.5", "", "n/a", "-3", "-0.0", "0", "12", "1e3", "1000",
        ];

        let mut state = seed;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let rows = (0..rows)
            .map(|_| {
                let label = LABELS[(next() % LABELS.len() as u64) as usize];
                let value = VALUES[(next() % VALUES.len() as u64) as usize];
                vec![Value::from(label), Value::from_raw(value)]
            })
            .collect();
        Table::from_rows(vec!["label".to_string(), "Value".to_string()], rows).unwrap()
    }

    #[test]
    fn test_cleaning_properties_hold_for_generated_tables() {
        for seed in 1..=64u64 {
            let input = generated_table(seed, 48);

            let deduped = remove_duplicates_numeric(input.clone(), &["Value"]);
            assert!(deduped.rows().iter().all(|row| input.rows().contains(row)));
            let keys: HashSet<_> = deduped
                .rows()
                .iter()
                .map(|row| row_key_numeric(row, &[1]))
                .collect();
            assert_eq!(keys.len(), deduped.len(), "seed {}", seed);

            let exact = remove_duplicates(input.clone());
            assert!(exact.rows().iter().all(|row| input.rows().contains(row)));
            let exact_keys: HashSet<_> = exact.rows().iter().map(|row| row_key(row)).collect();
            assert_eq!(exact_keys.len(), exact.len(), "seed {}", seed);

            let negatives = deduped
                .rows()
                .iter()
                .filter(|row| matches!(row[1].as_f64(), Some(v) if v < 0.0))
                .count();
            let cleaned = clean_numeric_column(deduped.clone(), "Value");
            assert_eq!(cleaned.len(), deduped.len() - negatives, "seed {}", seed);
            for cell in cleaned.column("Value").unwrap() {
                assert!(
                    matches!(cell, Value::Float(v) if v.is_finite() && *v >= 0.0),
                    "seed {}: {:?}",
                    seed,
                    cell
                );
            }
            assert!(ensure_numeric_column(&cleaned, "Value").is_ok());
        }
    }
}
