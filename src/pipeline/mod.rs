// ETL pipeline: per-source processing, orchestration and run bookkeeping

pub mod manifest;
pub mod orchestrator;
pub mod processing;
pub mod sources;

pub use orchestrator::{EtlPipeline, PipelineOutput, PipelineStage};
pub use sources::{CsvSourceProcessor, SourceJob, SourceProcessor};
