use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::*;
use crate::observability::metrics;
use crate::table::{Table, Value};

/// Quality assessment of one canonical table. Assessment is advisory:
/// rows are never removed, only reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub source_id: String,
    pub rows_assessed: usize,
    pub issues: Vec<QualityIssue>,
    pub rule_version: String,
}

/// Individual quality issue found during assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub issue_type: QualityIssueType,
    pub severity: QualitySeverity,
    pub description: String,
    /// Canonical column that triggered the issue
    pub field: String,
    /// Zero-based row index within the assessed table
    pub row: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityIssueType {
    /// Empty dimension label or code
    MissingData,
    /// Malformed period code
    InvalidFormat,
    /// Plausible but worth a look, e.g. a zero count that may be a filled-in gap
    SuspiciousValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualitySeverity {
    Info,
    Warning,
    Error,
}

impl QualitySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualitySeverity::Info => "info",
            QualitySeverity::Warning => "warning",
            QualitySeverity::Error => "error",
        }
    }
}

impl QualityReport {
    pub fn count(&self, severity: QualitySeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Trait for implementing quality assessment of canonical tables
pub trait QualityGate {
    fn assess(&self, source_id: &str, table: &Table) -> QualityReport;
}

#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Shortest acceptable period code (`2018-V06` is 8)
    pub min_period_code_len: usize,
    /// Report rows whose `valor` is zero
    pub flag_zero_values: bool,
    /// Issues logged individually before only the summary is logged
    pub max_issues_logged: usize,
    pub rule_version: String,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_period_code_len: 7,
            flag_zero_values: true,
            max_issues_logged: 10,
            rule_version: "v1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

const LABEL_COLUMNS: [&str; 8] = [
    COL_TRIMESTRE,
    COL_TRIMESTRE_DESC,
    COL_REGION_CODE,
    COL_REGION_NAME,
    COL_GRUPO_CODE,
    COL_GRUPO_DESC,
    COL_SEXO_CODE,
    COL_SEXO_DESC,
];

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    fn assess_row(&self, table: &Table, row_idx: usize, row: &[Value], issues: &mut Vec<QualityIssue>) {
        for column in LABEL_COLUMNS {
            let Some(idx) = table.column_index(column) else { continue };
            let empty = match &row[idx] {
                Value::Null => true,
                Value::Text(s) => s.trim().is_empty(),
                _ => false,
            };
            if empty {
                issues.push(QualityIssue {
                    issue_type: QualityIssueType::MissingData,
                    severity: QualitySeverity::Warning,
                    description: format!("{} is empty", column),
                    field: column.to_string(),
                    row: row_idx,
                });
            }
        }

        if let Some(idx) = table.column_index(COL_TRIMESTRE) {
            let code = row[idx].to_string();
            if !code.is_empty() && code.chars().count() < self.config.min_period_code_len {
                issues.push(QualityIssue {
                    issue_type: QualityIssueType::InvalidFormat,
                    severity: QualitySeverity::Error,
                    description: format!("Period code {:?} is too short", code),
                    field: COL_TRIMESTRE.to_string(),
                    row: row_idx,
                });
            }
        }

        if self.config.flag_zero_values {
            if let Some(idx) = table.column_index(COL_VALOR) {
                if row[idx].as_i64() == Some(0) {
                    issues.push(QualityIssue {
                        issue_type: QualityIssueType::SuspiciousValue,
                        severity: QualitySeverity::Info,
                        description: "valor is zero".to_string(),
                        field: COL_VALOR.to_string(),
                        row: row_idx,
                    });
                }
            }
        }
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, source_id: &str, table: &Table) -> QualityReport {
        let mut issues = Vec::new();
        for (row_idx, row) in table.rows().iter().enumerate() {
            self.assess_row(table, row_idx, row, &mut issues);
        }

        let report = QualityReport {
            source_id: source_id.to_string(),
            rows_assessed: table.len(),
            issues,
            rule_version: self.config.rule_version.clone(),
        };

        for severity in [QualitySeverity::Info, QualitySeverity::Warning, QualitySeverity::Error] {
            metrics::quality_gate::issues_detected(severity.as_str(), report.count(severity));
        }

        for issue in report
            .issues
            .iter()
            .filter(|i| i.severity >= QualitySeverity::Warning)
            .take(self.config.max_issues_logged)
        {
            warn!(source = source_id, row = issue.row, field = %issue.field, "{}", issue.description);
        }
        info!(
            source = source_id,
            rows = report.rows_assessed,
            errors = report.count(QualitySeverity::Error),
            warnings = report.count(QualitySeverity::Warning),
            info = report.count(QualitySeverity::Info),
            "Quality assessment complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_table(rows: Vec<[Value; 10]>) -> Table {
        Table::from_rows(
            CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.into_iter().map(|r| r.to_vec()).collect(),
        )
        .unwrap()
    }

    fn good_row(valor: i64) -> [Value; 10] {
        [
            "2018-V06".into(),
            "2018 may-jul".into(),
            "CHL14".into(),
            "Región de Los Ríos".into(),
            "ICSE93_T".into(),
            "Total".into(),
            "_T".into(),
            "Ambos sexos".into(),
            Value::Int(valor),
            CATEGORIA_FUENTE.into(),
        ]
    }

    #[test]
    fn test_clean_table_has_no_issues() {
        let gate = DefaultQualityGate::new();
        let report = gate.assess(CATEGORIA_SOURCE, &canonical_table(vec![good_row(189)]));
        assert!(report.is_clean());
        assert_eq!(report.rows_assessed, 1);
    }

    #[test]
    fn test_flags_short_period_and_empty_label() {
        let gate = DefaultQualityGate::new();
        let mut row = good_row(5);
        row[0] = "2018".into();
        row[7] = Value::Null;

        let report = gate.assess(CATEGORIA_SOURCE, &canonical_table(vec![row]));
        assert_eq!(report.count(QualitySeverity::Error), 1);
        assert_eq!(report.count(QualitySeverity::Warning), 1);
        assert!(report
            .issues
            .iter()
            .any(|i| i.issue_type == QualityIssueType::InvalidFormat && i.field == COL_TRIMESTRE));
    }

    #[test]
    fn test_zero_values_are_informational_and_configurable() {
        let table = canonical_table(vec![good_row(0)]);

        let report = DefaultQualityGate::new().assess(GRUPO_SOURCE, &table);
        assert_eq!(report.count(QualitySeverity::Info), 1);

        let quiet = DefaultQualityGate::with_config(QualityGateConfig {
            flag_zero_values: false,
            ..QualityGateConfig::default()
        });
        assert!(quiet.assess(GRUPO_SOURCE, &table).is_clean());
    }
}
