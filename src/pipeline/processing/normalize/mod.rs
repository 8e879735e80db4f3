//! Schema normalization: raw source columns to the canonical schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::table::{Table, Value};

pub mod schemas;

pub use schemas::{CATEGORIA_SCHEMA, GRUPO_SCHEMA};

/// How fractional values are rounded to whole thousands.
///
/// `HalfEven` sends exact `.5` ties to the even neighbour (2.5 -> 2,
/// 3.5 -> 4); `HalfUp` sends them up (2.5 -> 3). Values are non-negative
/// by the time they are rounded, so half-up and half-away-from-zero agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingPolicy {
    #[default]
    HalfEven,
    HalfUp,
}

impl RoundingPolicy {
    pub fn round(self, value: f64) -> f64 {
        match self {
            RoundingPolicy::HalfEven => value.round_ties_even(),
            RoundingPolicy::HalfUp => value.round(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingPolicy::HalfEven => "half-even",
            RoundingPolicy::HalfUp => "half-up",
        }
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoundingPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "half-even" | "bankers" => Ok(RoundingPolicy::HalfEven),
            "half-up" => Ok(RoundingPolicy::HalfUp),
            other => Err(EtlError::Config(format!(
                "unknown rounding policy '{}' (expected half-even or half-up)",
                other
            ))),
        }
    }
}

/// Column layout of one raw extract and how it maps onto the canonical schema.
/// The two known extracts differ only in the occupational code column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSchema {
    /// Identifier used in logs and as the key of the run results
    pub source_id: &'static str,
    /// Provenance tag stamped into `fuente`
    pub fuente: &'static str,
    /// Raw column holding the occupational classification code
    pub code_column: &'static str,
}

impl SourceSchema {
    pub fn required_columns(&self) -> [&'static str; 9] {
        [
            RAW_TRIMESTRE,
            RAW_TRIMESTRE_DESC,
            RAW_REGION,
            RAW_REGION_DESC,
            self.code_column,
            RAW_GRUPO_DESC,
            RAW_SEXO,
            RAW_SEXO_DESC,
            RAW_VALUE,
        ]
    }

    /// `(raw, canonical)` column pairs
    pub fn renames(&self) -> [(&'static str, &'static str); 9] {
        [
            (RAW_TRIMESTRE, COL_TRIMESTRE),
            (RAW_TRIMESTRE_DESC, COL_TRIMESTRE_DESC),
            (RAW_REGION, COL_REGION_CODE),
            (RAW_REGION_DESC, COL_REGION_NAME),
            (self.code_column, COL_GRUPO_CODE),
            (RAW_GRUPO_DESC, COL_GRUPO_DESC),
            (RAW_SEXO, COL_SEXO_CODE),
            (RAW_SEXO_DESC, COL_SEXO_DESC),
            (RAW_VALUE, COL_VALOR),
        ]
    }
}

/// 2^63; rounded values at or above it do not fit `valor`
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Rename, project and type a cleaned table into the canonical schema:
/// the nine mapped columns in canonical order, `valor` rounded to an
/// integer, and `fuente` set to the schema's tag. Columns outside the
/// mapping are dropped. A `valor` that is not a non-negative number is an
/// error, as is one too large for a 64-bit integer; cleaning is expected to
/// have run first.
pub fn normalize(table: Table, schema: &SourceSchema, rounding: RoundingPolicy) -> Result<Table> {
    let renamed = table.rename_columns(&schema.renames());
    let mut canonical = renamed.select(&CANONICAL_COLUMNS[..CANONICAL_COLUMNS.len() - 1])?;

    let mut row = 0;
    canonical.try_map_column(COL_VALOR, |v| {
        let rounded = v
            .as_f64()
            .filter(|x| *x >= 0.0)
            .map(|x| rounding.round(x))
            .filter(|x| *x < I64_BOUND)
            .ok_or_else(|| EtlError::UncleanData {
                column: COL_VALOR.to_string(),
                row,
                value: v.to_string(),
            })?;
        row += 1;
        Ok(Value::Int(rounded as i64))
    })?;

    Ok(canonical.with_constant_column(COL_FUENTE, Value::from(schema.fuente)))
}
