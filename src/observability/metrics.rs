//! Pipeline metrics.
//!
//! Counters are recorded through the `metrics` facade and are no-ops until
//! [`init`] installs a Prometheus recorder. The rendered exposition can be
//! written to a textfile-collector file at the end of a run.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{EtlError, Result};

/// Every metric name used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Extract
    ExtractRowsRead,
    ExtractFilesMissing,

    // Clean
    CleanDuplicatesRemoved,
    CleanNegativeRowsDropped,
    CleanMissingValuesFilled,
    CleanFailures,

    // Normalize
    NormalizeRowsProcessed,

    // Quality Gate
    QualityGateIssuesDetected,

    // Pipeline
    PipelineRunsSuccess,
    PipelineRunsError,
    PipelineDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ExtractRowsRead => "etl_extract_rows_read_total",
            MetricName::ExtractFilesMissing => "etl_extract_files_missing_total",

            MetricName::CleanDuplicatesRemoved => "etl_clean_duplicates_removed_total",
            MetricName::CleanNegativeRowsDropped => "etl_clean_negative_rows_dropped_total",
            MetricName::CleanMissingValuesFilled => "etl_clean_missing_values_filled_total",
            MetricName::CleanFailures => "etl_clean_failures_total",

            MetricName::NormalizeRowsProcessed => "etl_normalize_rows_processed_total",

            MetricName::QualityGateIssuesDetected => "etl_quality_gate_issues_detected_total",

            MetricName::PipelineRunsSuccess => "etl_pipeline_runs_success_total",
            MetricName::PipelineRunsError => "etl_pipeline_runs_error_total",
            MetricName::PipelineDuration => "etl_pipeline_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            ExtractRowsRead,
            ExtractFilesMissing,
            CleanDuplicatesRemoved,
            CleanNegativeRowsDropped,
            CleanMissingValuesFilled,
            CleanFailures,
            NormalizeRowsProcessed,
            QualityGateIssuesDetected,
            PipelineRunsSuccess,
            PipelineRunsError,
            PipelineDuration,
        ]
        .into_iter()
    }
}

/// Install the Prometheus recorder for this process
pub fn init() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| EtlError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    tracing::info!("Metrics recorder installed");
    Ok(handle)
}

/// Render the current metric values into `path`
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    fs::write(path, handle.render())?;
    tracing::info!(path = %path.display(), "Metrics snapshot written");
    Ok(())
}

// ============================================================================
// Per-phase recorders
// ============================================================================

pub mod extract {
    use super::MetricName;

    pub fn rows_read(source_id: &str, count: usize) {
        ::metrics::counter!(MetricName::ExtractRowsRead.as_str(), "source" => source_id.to_string())
            .increment(count as u64);
    }

    pub fn file_missing(source_id: &str) {
        ::metrics::counter!(MetricName::ExtractFilesMissing.as_str(), "source" => source_id.to_string())
            .increment(1);
    }
}

pub mod clean {
    use super::MetricName;

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::CleanDuplicatesRemoved.as_str()).increment(count as u64);
    }

    pub fn negative_rows_dropped(count: usize) {
        ::metrics::counter!(MetricName::CleanNegativeRowsDropped.as_str()).increment(count as u64);
    }

    pub fn missing_values_filled(count: usize) {
        ::metrics::counter!(MetricName::CleanMissingValuesFilled.as_str()).increment(count as u64);
    }

    pub fn failure() {
        ::metrics::counter!(MetricName::CleanFailures.as_str()).increment(1);
    }
}

pub mod normalize {
    use super::MetricName;

    pub fn rows_processed(source_id: &str, count: usize) {
        ::metrics::counter!(MetricName::NormalizeRowsProcessed.as_str(), "source" => source_id.to_string())
            .increment(count as u64);
    }
}

pub mod quality_gate {
    use super::MetricName;

    pub fn issues_detected(severity: &'static str, count: usize) {
        ::metrics::counter!(MetricName::QualityGateIssuesDetected.as_str(), "severity" => severity)
            .increment(count as u64);
    }
}

pub mod pipeline {
    use super::MetricName;

    pub fn run_success(duration_secs: f64) {
        ::metrics::counter!(MetricName::PipelineRunsSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::PipelineDuration.as_str()).record(duration_secs);
    }

    pub fn run_error(stage: &'static str) {
        ::metrics::counter!(MetricName::PipelineRunsError.as_str(), "stage" => stage).increment(1);
    }
}
