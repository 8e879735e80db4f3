//! Run summaries and the raw-versus-rounded comparison report.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::models::read_canonical_records;
use crate::pipeline::processing::normalize::RoundingPolicy;
use crate::table::Table;

/// Headline figures for one dataset of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub rows: usize,
    /// Sum of `valor`, thousands of persons
    pub valor_total: i64,
    pub periods: usize,
}

pub fn summarize(name: &str, table: &Table) -> DatasetSummary {
    let valor_total = table
        .column(COL_VALOR)
        .map(|cells| cells.iter().filter_map(|v| v.as_i64()).sum::<i64>())
        .unwrap_or(0);
    let periods = table
        .column(COL_TRIMESTRE)
        .map(|cells| cells.iter().map(|v| v.to_string()).collect::<BTreeSet<_>>().len())
        .unwrap_or(0);

    DatasetSummary {
        name: name.to_string(),
        rows: table.len(),
        valor_total,
        periods,
    }
}

pub fn summarize_all(tables: &BTreeMap<String, Table>) -> Vec<DatasetSummary> {
    tables.iter().map(|(name, t)| summarize(name, t)).collect()
}

/// One raw value next to its rounded counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingSample {
    pub grupo_ocupacional: String,
    pub sexo: String,
    pub raw_value: f64,
    pub rounded: i64,
}

/// How much rounding to whole thousands moved the totals of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingComparison {
    pub source_id: String,
    pub raw_total: f64,
    pub rounded_total: i64,
    pub difference: f64,
    pub percent_difference: f64,
    pub samples: Vec<RoundingSample>,
}

/// Compare the numeric `Value` cells of a raw extract with the `valor`
/// column of its processed file. Non-numeric raw cells are skipped;
/// negative raw values are skipped too, since the pipeline drops them.
pub fn compare_rounding(
    source_id: &str,
    raw_path: &Path,
    processed_path: &Path,
    samples: usize,
    rounding: RoundingPolicy,
) -> Result<RoundingComparison> {
    for path in [raw_path, processed_path] {
        if !path.exists() {
            return Err(EtlError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let raw = Table::read_csv(raw_path)?;
    let value_idx = raw.column_index(RAW_VALUE).ok_or_else(|| EtlError::Schema {
        source_id: source_id.to_string(),
        missing: vec![RAW_VALUE.to_string()],
    })?;
    let grupo_idx = raw.column_index(RAW_GRUPO_DESC);
    let sexo_idx = raw.column_index(RAW_SEXO_DESC);

    let raw_total: f64 = raw
        .rows()
        .iter()
        .filter_map(|row| row[value_idx].as_f64())
        .filter(|v| *v >= 0.0)
        .sum();

    let samples = raw
        .rows()
        .iter()
        .filter_map(|row| {
            let value = row[value_idx].as_f64().filter(|v| *v >= 0.0)?;
            let label = |idx: Option<usize>| idx.map(|i| row[i].to_string()).unwrap_or_default();
            Some(RoundingSample {
                grupo_ocupacional: label(grupo_idx),
                sexo: label(sexo_idx),
                raw_value: value,
                rounded: rounding.round(value) as i64,
            })
        })
        .take(samples)
        .collect();

    let rounded_total: i64 = read_canonical_records(processed_path)?
        .iter()
        .map(|r| r.valor)
        .sum();

    let difference = (raw_total - rounded_total as f64).abs();
    let percent_difference = if raw_total == 0.0 {
        0.0
    } else {
        difference / raw_total * 100.0
    };

    Ok(RoundingComparison {
        source_id: source_id.to_string(),
        raw_total,
        rounded_total,
        difference,
        percent_difference,
        samples,
    })
}

/// Save comparisons as pretty JSON in `reports_dir`
pub fn save_comparisons(reports_dir: &Path, comparisons: &[RoundingComparison]) -> Result<PathBuf> {
    let path = reports_dir.join(ROUNDING_REPORT_FILE);
    let json = serde_json::to_string_pretty(comparisons)?;
    fs::write(&path, json).map_err(|e| EtlError::Persistence {
        path: path.clone(),
        source: e.into(),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::tempdir;

    #[test]
    fn test_summarize_counts_rows_totals_and_periods() {
        let table = Table::from_rows(
            vec![COL_TRIMESTRE.to_string(), COL_VALOR.to_string()],
            vec![
                vec!["2018-V06".into(), Value::Int(10)],
                vec!["2018-V06".into(), Value::Int(5)],
                vec!["2018-V07".into(), Value::Int(1)],
            ],
        )
        .unwrap();

        let summary = summarize("unified", &table);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.valor_total, 16);
        assert_eq!(summary.periods, 2);
    }

    #[test]
    fn test_compare_rounding_totals() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        let processed = dir.path().join("processed.csv");
        fs::write(
            &raw,
            "Grupo ocupacional,Sexo,Value\nTotal,Hombres,188.554\nTotal,Mujeres,10.4\nTotal,Mujeres,-2\nTotal,Hombres,x\n",
        )
        .unwrap();
        fs::write(
            &processed,
            "trimestre_movil,trimestre_movil_desc,region_code,region_name,grupo_ocupacional_code,grupo_ocupacional_desc,sexo_code,sexo_desc,valor,fuente\n\
             2018-V06,d,CHL14,r,c,Total,1,Hombres,189,categoria_ocupacional\n\
             2018-V06,d,CHL14,r,c,Total,2,Mujeres,10,categoria_ocupacional\n",
        )
        .unwrap();

        let cmp = compare_rounding(CATEGORIA_SOURCE, &raw, &processed, 1, RoundingPolicy::HalfEven).unwrap();
        assert!((cmp.raw_total - 198.954).abs() < 1e-9);
        assert_eq!(cmp.rounded_total, 199);
        assert!((cmp.difference - 0.046).abs() < 1e-9);
        assert_eq!(cmp.samples.len(), 1);
        assert_eq!(cmp.samples[0].rounded, 189);
        assert_eq!(cmp.samples[0].sexo, "Hombres");

        let saved = save_comparisons(dir.path(), &[cmp]).unwrap();
        assert!(saved.exists());
    }

    #[test]
    fn test_compare_rounding_missing_processed_file() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        fs::write(&raw, "Value\n1\n").unwrap();

        let err = compare_rounding(GRUPO_SOURCE, &raw, &dir.path().join("none.csv"), 5, RoundingPolicy::HalfUp)
            .unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
    }
}
