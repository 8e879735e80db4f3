//! Full pipeline run: every source end to end, then the unified table.

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Instant;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{UNIFIED_DATASET, UNIFIED_PROCESSED_FILE};
use crate::error::{ErrorKind, EtlError, Result};
use crate::observability::metrics;
use crate::paths::ProjectPaths;
use crate::pipeline::manifest::{OutputFile, RunManifest};
use crate::pipeline::processing::normalize::RoundingPolicy;
use crate::pipeline::processing::quality_gate::{DefaultQualityGate, QualityGate, QualityReport};
use crate::pipeline::sources::csv_source::default_jobs;
use crate::pipeline::sources::SourceJob;
use crate::table::Table;

/// Where a run is. A failed run keeps the stage it failed in plus the kind
/// and message of the error; the error itself is what `run_full_pipeline`
/// returns. The next run starts again from `NotStarted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    NotStarted,
    Extracting { source_id: String },
    Transforming { source_id: String },
    Loading { source_id: String },
    Concatenating,
    LoadingUnified,
    Done,
    Failed {
        at: Box<PipelineStage>,
        kind: ErrorKind,
        error: String,
    },
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::NotStarted => "not_started",
            PipelineStage::Extracting { .. } => "extracting",
            PipelineStage::Transforming { .. } => "transforming",
            PipelineStage::Loading { .. } => "loading",
            PipelineStage::Concatenating => "concatenating",
            PipelineStage::LoadingUnified => "loading_unified",
            PipelineStage::Done => "done",
            PipelineStage::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed { .. })
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Extracting { source_id }
            | PipelineStage::Transforming { source_id }
            | PipelineStage::Loading { source_id } => write!(f, "{}({})", self.label(), source_id),
            PipelineStage::Failed { at, kind, error } => {
                write!(f, "failed at {} ({}): {}", at, kind, error)
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

/// Stage history of the current run
#[derive(Debug, Clone)]
struct StageTracker {
    history: Vec<PipelineStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            history: vec![PipelineStage::NotStarted],
        }
    }

    fn current(&self) -> &PipelineStage {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    fn advance(&mut self, stage: PipelineStage) {
        tracing::debug!(stage = %stage, "pipeline stage");
        self.history.push(stage);
    }

    fn fail(&mut self, error: &EtlError) {
        let at = Box::new(self.current().clone());
        self.history.push(PipelineStage::Failed {
            at,
            kind: error.kind(),
            error: error.to_string(),
        });
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One entry per source id plus `"unified"`
    pub tables: BTreeMap<String, Table>,
    pub quality: Vec<QualityReport>,
    pub manifest: RunManifest,
}

impl PipelineOutput {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

pub struct EtlPipeline {
    paths: ProjectPaths,
    jobs: Vec<SourceJob>,
    quality_gate: Box<dyn QualityGate>,
    rounding: RoundingPolicy,
    unified_file: String,
    tracker: StageTracker,
}

impl EtlPipeline {
    /// Pipeline over the two survey extracts
    pub fn new(config: &Config) -> Result<Self> {
        let paths = ProjectPaths::new(config)?;
        let jobs = default_jobs(&paths, config.rounding);
        Self::with_jobs(paths, jobs, config.rounding)
    }

    /// Pipeline over arbitrary sources, run in the given order. Source ids
    /// must be unique and must not collide with the unified dataset name.
    pub fn with_jobs(paths: ProjectPaths, jobs: Vec<SourceJob>, rounding: RoundingPolicy) -> Result<Self> {
        let mut seen = HashSet::new();
        for job in &jobs {
            let id = job.processor.source_id();
            if id == UNIFIED_DATASET || !seen.insert(id.to_string()) {
                return Err(EtlError::Config(format!("duplicate or reserved source id: {}", id)));
            }
        }

        Ok(Self {
            paths,
            jobs,
            quality_gate: Box::new(DefaultQualityGate::new()),
            rounding,
            unified_file: UNIFIED_PROCESSED_FILE.to_string(),
            tracker: StageTracker::new(),
        })
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn jobs(&self) -> &[SourceJob] {
        &self.jobs
    }

    pub fn stage(&self) -> &PipelineStage {
        self.tracker.current()
    }

    /// Stages visited by the most recent run, starting at `NotStarted`
    pub fn stage_history(&self) -> &[PipelineStage] {
        &self.tracker.history
    }

    /// Run every source end to end, concatenate their outputs in source
    /// order and write the unified table. Any failure aborts the run and
    /// is returned unchanged; nothing is returned for a partial run.
    pub fn run_full_pipeline(&mut self) -> Result<PipelineOutput> {
        self.tracker = StageTracker::new();
        let timer = Instant::now();
        info!("Starting full ETL pipeline");

        match self.execute() {
            Ok(output) => {
                self.tracker.advance(PipelineStage::Done);
                metrics::pipeline::run_success(timer.elapsed().as_secs_f64());
                info!(
                    run_id = %output.manifest.run_id,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "ETL pipeline completed successfully"
                );
                Ok(output)
            }
            Err(e) => {
                metrics::pipeline::run_error(self.tracker.current().label());
                self.tracker.fail(&e);
                error!(stage = %self.tracker.current(), "Error in ETL pipeline: {}", e);
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<PipelineOutput> {
        let started_at = Utc::now();
        let Self {
            paths,
            jobs,
            quality_gate,
            rounding,
            unified_file,
            tracker,
        } = self;

        let mut processed: Vec<(String, Table)> = Vec::with_capacity(jobs.len());
        let mut outputs = Vec::with_capacity(jobs.len() + 1);
        let mut quality = Vec::with_capacity(jobs.len());

        for job in jobs.iter() {
            let source_id = job.processor.source_id().to_string();
            let span = info_span!("source", source = %source_id);
            let _enter = span.enter();
            info!("Processing source");

            tracker.advance(PipelineStage::Extracting {
                source_id: source_id.clone(),
            });
            let raw = job.processor.extract(&job.input_file)?;

            tracker.advance(PipelineStage::Transforming {
                source_id: source_id.clone(),
            });
            let table = job.processor.transform(raw)?;
            quality.push(quality_gate.assess(&source_id, &table));

            tracker.advance(PipelineStage::Loading {
                source_id: source_id.clone(),
            });
            job.processor.load(&table, &job.output_file)?;
            outputs.push(OutputFile::describe(
                &source_id,
                &paths.processed_data().join(&job.output_file),
                table.len(),
            )?);

            processed.push((source_id, table));
        }

        tracker.advance(PipelineStage::Concatenating);
        info!("Building unified dataset");
        let parts: Vec<&Table> = processed.iter().map(|(_, t)| t).collect();
        let unified = Table::concat(&parts)?;

        tracker.advance(PipelineStage::LoadingUnified);
        let unified_path = paths.processed_data().join(unified_file.as_str());
        unified.write_csv(&unified_path)?;
        outputs.push(OutputFile::describe(UNIFIED_DATASET, &unified_path, unified.len())?);

        let manifest = RunManifest {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            rounding: *rounding,
            outputs,
        };
        let manifest_path = manifest.write(paths.reports())?;
        info!(path = %manifest_path.display(), "Run manifest written");

        let mut tables: BTreeMap<String, Table> = processed.into_iter().collect();
        tables.insert(UNIFIED_DATASET.to_string(), unified);

        Ok(PipelineOutput {
            tables,
            quality,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::pipeline::sources::SourceProcessor;
    use crate::table::Value;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    /// Source that fabricates canonical rows instead of reading a file
    struct FixedSource {
        id: &'static str,
        rows: usize,
        fail_transform: bool,
        out_dir: PathBuf,
    }

    impl SourceProcessor for FixedSource {
        fn source_id(&self) -> &str {
            self.id
        }

        fn required_columns(&self) -> Vec<&'static str> {
            CANONICAL_COLUMNS.to_vec()
        }

        fn extract(&self, _file_name: &str) -> Result<Table> {
            let columns = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
            let rows = (0..self.rows)
                .map(|i| {
                    let mut row: Vec<Value> = (0..8).map(|_| Value::from("x")).collect();
                    row[0] = Value::from("2020-V01");
                    row.push(Value::Int(i as i64 + 1));
                    row.push(Value::from(self.id));
                    row
                })
                .collect();
            Table::from_rows(columns, rows)
        }

        fn transform(&self, table: Table) -> Result<Table> {
            if self.fail_transform {
                return Err(EtlError::Schema {
                    source_id: self.id.to_string(),
                    missing: vec![RAW_VALUE.to_string()],
                });
            }
            Ok(table)
        }

        fn load(&self, table: &Table, output_filename: &str) -> Result<()> {
            table.write_csv(&self.out_dir.join(output_filename))
        }
    }

    fn job(paths: &ProjectPaths, id: &'static str, rows: usize, fail_transform: bool) -> SourceJob {
        SourceJob::new(
            Box::new(FixedSource {
                id,
                rows,
                fail_transform,
                out_dir: paths.processed_data().to_path_buf(),
            }),
            format!("{}.csv", id),
            format!("{}_out.csv", id),
        )
    }

    fn paths(dir: &Path) -> ProjectPaths {
        ProjectPaths::new(&Config::with_base_path(dir)).unwrap()
    }

    #[test]
    fn test_rejects_duplicate_and_reserved_source_ids() {
        let dir = tempdir().unwrap();
        let p = paths(dir.path());

        let dup = EtlPipeline::with_jobs(
            p.clone(),
            vec![job(&p, "a", 1, false), job(&p, "a", 1, false)],
            RoundingPolicy::HalfEven,
        );
        assert!(dup.is_err());

        let reserved = EtlPipeline::with_jobs(p.clone(), vec![job(&p, "unified", 1, false)], RoundingPolicy::HalfEven);
        assert!(reserved.is_err());
    }

    #[test]
    fn test_successful_run_walks_every_stage() {
        let dir = tempdir().unwrap();
        let p = paths(dir.path());
        let mut pipeline = EtlPipeline::with_jobs(
            p.clone(),
            vec![job(&p, "a", 2, false), job(&p, "b", 3, false)],
            RoundingPolicy::HalfEven,
        )
        .unwrap();

        let output = pipeline.run_full_pipeline().unwrap();

        let unified = output.table(UNIFIED_DATASET).unwrap();
        assert_eq!(unified.len(), 5);
        let fuentes: Vec<String> = unified.column(COL_FUENTE).unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(fuentes, vec!["a", "a", "b", "b", "b"]);
        assert_eq!(output.tables.len(), 3);
        assert_eq!(output.quality.len(), 2);
        assert_eq!(output.manifest.outputs.len(), 3);

        let labels: Vec<&str> = pipeline.stage_history().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "not_started",
                "extracting",
                "transforming",
                "loading",
                "extracting",
                "transforming",
                "loading",
                "concatenating",
                "loading_unified",
                "done",
            ]
        );
    }

    #[test]
    fn test_failure_records_failed_stage_and_skips_unified() {
        let dir = tempdir().unwrap();
        let p = paths(dir.path());
        let mut pipeline = EtlPipeline::with_jobs(
            p.clone(),
            vec![job(&p, "a", 1, false), job(&p, "b", 1, true)],
            RoundingPolicy::HalfEven,
        )
        .unwrap();

        let err = pipeline.run_full_pipeline().unwrap_err();
        assert!(matches!(err, EtlError::Schema { .. }));
        match pipeline.stage() {
            PipelineStage::Failed { at, kind, .. } => {
                assert_eq!(
                    **at,
                    PipelineStage::Transforming {
                        source_id: "b".to_string()
                    }
                );
                assert_eq!(*kind, ErrorKind::Schema);
            }
            other => panic!("expected failed stage, got {}", other),
        }
        assert!(!p.processed_data().join(UNIFIED_PROCESSED_FILE).exists());
        assert!(!p.reports().join(RUN_MANIFEST_FILE).exists());
    }

    #[test]
    fn test_stage_display() {
        let stage = PipelineStage::Failed {
            at: Box::new(PipelineStage::Transforming {
                source_id: "grupo_ocupacional".to_string(),
            }),
            kind: ErrorKind::UncleanData,
            error: "boom".to_string(),
        };
        assert_eq!(
            stage.to_string(),
            "failed at transforming(grupo_ocupacional) (unclean_data): boom"
        );
        assert!(stage.is_terminal());
        assert!(!PipelineStage::Concatenating.is_terminal());
    }
}
