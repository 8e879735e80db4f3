//! Source processors: one extract -> transform -> load sequence per raw extract.

pub mod csv_source;

pub use csv_source::CsvSourceProcessor;

use crate::error::{EtlError, Result};
use crate::pipeline::processing::validate::missing_columns;
use crate::table::Table;

/// The three-stage contract every source implements. The orchestrator only
/// sees this trait, so adding a source means adding an implementation and
/// a [`SourceJob`], nothing more.
pub trait SourceProcessor {
    /// Identifier used as the dataset name in the run results
    fn source_id(&self) -> &str;

    /// Columns the raw extract must carry
    fn required_columns(&self) -> Vec<&'static str>;

    /// Read `file_name` from the raw-data directory
    fn extract(&self, file_name: &str) -> Result<Table>;

    /// Validate, clean and normalize an extracted table
    fn transform(&self, table: Table) -> Result<Table>;

    /// Write `table` to `output_filename` in the processed-data directory,
    /// replacing any previous file
    fn load(&self, table: &Table, output_filename: &str) -> Result<()>;

    /// Extract and check the schema without transforming or writing anything.
    /// Returns the number of raw rows.
    fn check(&self, file_name: &str) -> Result<usize> {
        let table = self.extract(file_name)?;
        let missing = missing_columns(&table, &self.required_columns());
        if !missing.is_empty() {
            return Err(EtlError::Schema {
                source_id: self.source_id().to_string(),
                missing,
            });
        }
        Ok(table.len())
    }
}

/// A processor plus the fixed files it reads and writes
pub struct SourceJob {
    pub processor: Box<dyn SourceProcessor>,
    pub input_file: String,
    pub output_file: String,
}

impl SourceJob {
    pub fn new(
        processor: Box<dyn SourceProcessor>,
        input_file: impl Into<String>,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            input_file: input_file.into(),
            output_file: output_file.into(),
        }
    }
}
