//! In-memory tabular data shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of column names plus rows of [`Value`]
//! cells. Raw extracts arrive as text cells; cleaning and normalization
//! convert the value column to numbers in place.

use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{EtlError, Result};

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(i64),
    Null,
}

impl Value {
    /// Build a cell from raw CSV text; empty cells are missing values
    pub fn from_raw(cell: &str) -> Self {
        if cell.is_empty() {
            Value::Null
        } else {
            Value::Text(cell.to_string())
        }
    }

    /// Numeric view of the cell. Text is parsed leniently (surrounding
    /// whitespace allowed); non-finite numbers count as non-numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v).filter(|v| v.is_finite()),
            Value::Int(v) => Some(*v as f64),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn key(&self) -> CellKey<'_> {
        match self {
            Value::Text(s) => CellKey::Text(s.as_str()),
            Value::Float(v) => CellKey::Float(v.to_bits()),
            Value::Int(v) => CellKey::Int(*v),
            Value::Null => CellKey::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Hashable identity of a cell; floats compare by bit pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellKey<'a> {
    Text(&'a str),
    Float(u64),
    Int(i64),
    Null,
}

pub(crate) fn row_key(row: &[Value]) -> Vec<CellKey<'_>> {
    row.iter().map(Value::key).collect()
}

/// Like [`row_key`], but cells at `numeric` positions that parse as numbers
/// are keyed by value, so `188.5` and `188.50` are the same cell. Negative
/// zero keys as zero.
pub(crate) fn row_key_numeric<'a>(row: &'a [Value], numeric: &[usize]) -> Vec<CellKey<'a>> {
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            if numeric.contains(&idx) {
                if let Some(v) = cell.as_f64() {
                    return CellKey::Float((v + 0.0).to_bits());
                }
            }
            cell.key()
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose width differs from the header
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::Table(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Replace every cell of `name` with `f(cell)`
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Value,
    {
        self.try_map_column(name, |v| Ok(f(v)))
    }

    /// Like [`Table::map_column`] but stops at the first error. Cells
    /// before the failing row are already replaced.
    pub fn try_map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let idx = self
            .column_index(name)
            .ok_or_else(|| EtlError::Table(format!("unknown column: {}", name)))?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(())
    }

    /// Rename columns by `(from, to)` pairs; names not in the table are ignored
    pub fn rename_columns(mut self, mapping: &[(&str, &str)]) -> Self {
        let lookup: HashMap<&str, &str> = mapping.iter().copied().collect();
        for column in &mut self.columns {
            if let Some(to) = lookup.get(column.as_str()) {
                *column = (*to).to_string();
            }
        }
        self
    }

    /// Project onto `names` in that order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| EtlError::Table(format!("unknown column: {}", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Append (or overwrite) a column holding the same value on every row
    pub fn with_constant_column(mut self, name: &str, value: Value) -> Self {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }

    /// Row-wise concatenation. All tables must share the same column list;
    /// row order is preserved, table by table.
    pub fn concat(tables: &[&Table]) -> Result<Table> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };

        let mut out = Table::new(first.columns.clone());
        out.rows.reserve(tables.iter().map(|t| t.len()).sum());
        for table in tables {
            if table.columns != out.columns {
                return Err(EtlError::Table(format!(
                    "cannot concatenate tables with different columns: {:?} vs {:?}",
                    out.columns, table.columns
                )));
            }
            out.rows.extend(table.rows.iter().cloned());
        }
        Ok(out)
    }

    /// Read a comma-separated file with a header row. Every cell is kept
    /// as text; empty cells become [`Value::Null`].
    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record?;
            table.rows.push(record.iter().map(Value::from_raw).collect());
        }
        Ok(table)
    }

    /// Write the table with a header row and no index column, replacing
    /// whatever is at `path`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let persistence = |source: csv::Error| EtlError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = WriterBuilder::new().from_path(path).map_err(persistence)?;
        writer.write_record(&self.columns).map_err(persistence)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(persistence)?;
        }
        writer.flush().map_err(|e| persistence(e.into()))?;
        Ok(())
    }
}
