use std::path::PathBuf;
use tracing::{error, info};

use super::{SourceJob, SourceProcessor};
use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::paths::ProjectPaths;
use crate::pipeline::processing::clean::{
    clean_numeric_column, ensure_numeric_column, remove_duplicates_numeric,
};
use crate::pipeline::processing::normalize::{normalize, RoundingPolicy, SourceSchema, CATEGORIA_SCHEMA, GRUPO_SCHEMA};
use crate::pipeline::processing::validate::{missing_columns, validate_file_exists, validate_schema};
use crate::table::Table;

/// Processor for a comma-separated survey extract described by a [`SourceSchema`]
pub struct CsvSourceProcessor {
    schema: SourceSchema,
    raw_dir: PathBuf,
    processed_dir: PathBuf,
    rounding: RoundingPolicy,
}

impl CsvSourceProcessor {
    pub fn new(schema: SourceSchema, paths: &ProjectPaths, rounding: RoundingPolicy) -> Self {
        Self {
            schema,
            raw_dir: paths.raw_data().to_path_buf(),
            processed_dir: paths.processed_data().to_path_buf(),
            rounding,
        }
    }

    /// Occupational category extract (CISE codes)
    pub fn categoria(paths: &ProjectPaths, rounding: RoundingPolicy) -> Self {
        Self::new(CATEGORIA_SCHEMA, paths, rounding)
    }

    /// CIUO-88 occupational group extract
    pub fn grupo(paths: &ProjectPaths, rounding: RoundingPolicy) -> Self {
        Self::new(GRUPO_SCHEMA, paths, rounding)
    }
}

impl SourceProcessor for CsvSourceProcessor {
    fn source_id(&self) -> &str {
        self.schema.source_id
    }

    fn required_columns(&self) -> Vec<&'static str> {
        self.schema.required_columns().to_vec()
    }

    fn extract(&self, file_name: &str) -> Result<Table> {
        let full_path = self.raw_dir.join(file_name);

        if !validate_file_exists(&full_path) {
            metrics::extract::file_missing(self.schema.source_id);
            return Err(EtlError::NotFound { path: full_path });
        }

        let table = Table::read_csv(&full_path).map_err(|e| {
            error!(path = %full_path.display(), "Error extracting data: {}", e);
            e
        })?;

        metrics::extract::rows_read(self.schema.source_id, table.len());
        info!("Extracted {} records from {}", table.len(), file_name);
        Ok(table)
    }

    fn transform(&self, table: Table) -> Result<Table> {
        let required = self.schema.required_columns();
        if !validate_schema(&table, &required) {
            let err = EtlError::Schema {
                source_id: self.schema.source_id.to_string(),
                missing: missing_columns(&table, &required),
            };
            error!("Error transforming data: {}", err);
            return Err(err);
        }

        // Duplicates are judged before rounding, with `Value` compared as a number.
        let table = remove_duplicates_numeric(table, &[RAW_VALUE]);
        let table = clean_numeric_column(table, RAW_VALUE);

        let result = ensure_numeric_column(&table, RAW_VALUE)
            .and_then(|()| normalize(table, &self.schema, self.rounding));
        let table = result.map_err(|e| {
            error!("Error transforming data: {}", e);
            e
        })?;

        metrics::normalize::rows_processed(self.schema.source_id, table.len());
        info!("Transformed {} records", table.len());
        Ok(table)
    }

    fn load(&self, table: &Table, output_filename: &str) -> Result<()> {
        let output_path = self.processed_dir.join(output_filename);
        table.write_csv(&output_path).map_err(|e| {
            error!("Error saving data: {}", e);
            e
        })?;
        info!(path = %output_path.display(), "Data saved");
        Ok(())
    }
}

/// The two survey extracts, in pipeline order
pub fn default_jobs(paths: &ProjectPaths, rounding: RoundingPolicy) -> Vec<SourceJob> {
    vec![
        SourceJob::new(
            Box::new(CsvSourceProcessor::categoria(paths, rounding)),
            CATEGORIA_RAW_FILE,
            CATEGORIA_PROCESSED_FILE,
        ),
        SourceJob::new(
            Box::new(CsvSourceProcessor::grupo(paths, rounding)),
            GRUPO_RAW_FILE,
            GRUPO_PROCESSED_FILE,
        ),
    ]
}
