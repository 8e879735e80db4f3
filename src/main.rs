use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use ocupacion_etl::config::Config;
use ocupacion_etl::observability::{init_logging, metrics};
use ocupacion_etl::pipeline::processing::normalize::RoundingPolicy;
use ocupacion_etl::pipeline::processing::quality_gate::QualitySeverity;
use ocupacion_etl::pipeline::EtlPipeline;
use ocupacion_etl::report;

#[derive(Parser)]
#[command(name = "ocupacion_etl")]
#[command(about = "ETL pipeline for regional occupational employment survey extracts")]
#[command(version)]
struct Cli {
    /// Project root holding data/, reports/ and logs/ (default: current directory)
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    /// Tie-breaking rule when rounding values: half-even or half-up
    #[arg(long, global = true)]
    rounding: Option<RoundingPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL pipeline over both extracts
    Run {
        /// Write a Prometheus text snapshot of the run metrics to this file
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },
    /// Compare raw values with their rounded, processed counterparts
    Compare {
        /// Number of sample rows to show per source
        #[arg(long, default_value_t = 10)]
        samples: usize,
        /// Also save the comparison as JSON under the reports directory
        #[arg(long)]
        save: bool,
    },
    /// Check that raw extracts exist and carry their required columns
    Validate,
}

fn run(config: &Config, metrics_file: Option<PathBuf>) -> anyhow::Result<()> {
    let handle = match &metrics_file {
        Some(_) => Some(metrics::init()?),
        None => None,
    };

    let mut pipeline = EtlPipeline::new(config)?;
    let result = pipeline.run_full_pipeline();

    if let (Some(handle), Some(path)) = (&handle, &metrics_file) {
        metrics::write_snapshot(handle, path)?;
    }
    let output = result?;

    println!("\n📊 Pipeline results (run {}):", output.manifest.run_id);
    for summary in report::summarize_all(&output.tables) {
        println!(
            "   {}: {} records, {} thousand persons, {} periods",
            summary.name, summary.rows, summary.valor_total, summary.periods
        );
    }

    for quality in &output.quality {
        if !quality.is_clean() {
            warn!(
                source = %quality.source_id,
                errors = quality.count(QualitySeverity::Error),
                warnings = quality.count(QualitySeverity::Warning),
                "Quality issues found"
            );
        }
    }
    Ok(())
}

fn compare(config: &Config, samples: usize, save: bool) -> anyhow::Result<()> {
    let pipeline = EtlPipeline::new(config)?;
    let paths = pipeline.paths();

    let mut comparisons = Vec::new();
    for job in pipeline.jobs() {
        let comparison = report::compare_rounding(
            job.processor.source_id(),
            &paths.raw_data().join(&job.input_file),
            &paths.processed_data().join(&job.output_file),
            samples,
            config.rounding,
        )?;

        println!("\n=== {} ===", comparison.source_id);
        for sample in &comparison.samples {
            println!(
                "   {} | {} | {} -> {}",
                sample.grupo_ocupacional, sample.sexo, sample.raw_value, sample.rounded
            );
        }
        println!("   Raw total:     {:.3} thousand", comparison.raw_total);
        println!("   Rounded total: {} thousand", comparison.rounded_total);
        println!(
            "   Difference:    {:.3} thousand ({:.4}%)",
            comparison.difference, comparison.percent_difference
        );
        comparisons.push(comparison);
    }

    if save {
        let path = report::save_comparisons(paths.reports(), &comparisons)?;
        info!(path = %path.display(), "Rounding comparison saved");
    }
    Ok(())
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let pipeline = EtlPipeline::new(config)?;

    let mut failures = 0;
    for job in pipeline.jobs() {
        match job.processor.check(&job.input_file) {
            Ok(rows) => println!("✅ {}: {} ({} rows)", job.processor.source_id(), job.input_file, rows),
            Err(e) => {
                failures += 1;
                println!("❌ {}: {}", job.processor.source_id(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} source(s) failed validation", failures);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.base_path)?;
    if let Some(rounding) = cli.rounding {
        config.rounding = rounding;
    }

    let _guard = init_logging(&config.logs_dir, &config.log_level)?;
    info!(base_path = %config.base_path.display(), rounding = %config.rounding, "Configuration loaded");

    let result = match cli.command {
        Commands::Run { metrics_file } => run(&config, metrics_file),
        Commands::Compare { samples, save } => compare(&config, samples, save),
        Commands::Validate => validate(&config),
    };

    if let Err(e) = &result {
        error!("Execution failed: {:#}", e);
    }
    result
}
