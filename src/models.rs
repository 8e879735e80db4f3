use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// One row of a processed file, in canonical column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub trimestre_movil: String,
    pub trimestre_movil_desc: String,
    pub region_code: String,
    pub region_name: String,
    pub grupo_ocupacional_code: String,
    pub grupo_ocupacional_desc: String,
    pub sexo_code: String,
    pub sexo_desc: String,
    /// Thousands of persons
    pub valor: i64,
    pub fuente: String,
}

impl CanonicalRecord {
    /// Record-level checks: `valor` is non-negative and the period code
    /// looks like `YYYY-Vnn`.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.valor < 0 {
            return Err(format!("valor cannot be negative: {}", self.valor));
        }
        if self.trimestre_movil.chars().count() < 7 {
            return Err(format!(
                "invalid trimestre_movil format: {:?}",
                self.trimestre_movil
            ));
        }
        Ok(())
    }
}

/// Read a processed file back as typed records
pub fn read_canonical_records(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<CanonicalRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(valor: i64, trimestre: &str) -> CanonicalRecord {
        CanonicalRecord {
            trimestre_movil: trimestre.to_string(),
            trimestre_movil_desc: "2018 may-jul".to_string(),
            region_code: "CHL14".to_string(),
            region_name: "Región de Los Ríos".to_string(),
            grupo_ocupacional_code: "ICSE93_T".to_string(),
            grupo_ocupacional_desc: "Total".to_string(),
            sexo_code: "_T".to_string(),
            sexo_desc: "Ambos sexos".to_string(),
            valor,
            fuente: "categoria_ocupacional".to_string(),
        }
    }

    #[test]
    fn test_valid_record() {
        assert!(record(189, "2018-V06").validate().is_ok());
    }

    #[test]
    fn test_negative_valor_is_rejected() {
        assert!(record(-100, "2018-V06").validate().is_err());
    }

    #[test]
    fn test_short_period_code_is_rejected() {
        assert!(record(10, "2018").validate().is_err());
    }
}
