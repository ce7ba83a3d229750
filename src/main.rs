use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use osbb_scraper::constants::EXPORT_HEADER;
use osbb_scraper::registry::DatasetRegistry;
use osbb_scraper::{dispatch, logging, metrics, CanonicalRecord, Config, Pipeline, RawBlob};

#[derive(Parser)]
#[command(name = "osbb_scraper")]
#[command(about = "Normalizes OSBB registry datasets into canonical records")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a single downloaded dataset file
    Parse {
        /// Declared format tag: CSV, JSON, API, XLS, XLSX
        #[arg(long)]
        format: String,
        /// Dataset page URL recorded as provenance on every record
        #[arg(long)]
        source_url: String,
        /// Downloaded resource
        input: PathBuf,
        /// TOML file overriding alias lists or the city table
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write CSV here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Do not fill empty cities from the dataset URL
        #[arg(long)]
        no_backfill: bool,
    },
    /// Normalize every dataset listed in a manifest
    Batch {
        /// TOML manifest with [[dataset]] entries
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_backfill: bool,
    },
}

fn build_pipeline(config: Option<&Path>, no_backfill: bool) -> anyhow::Result<Pipeline> {
    let config = Config::resolve(config).context("loading configuration")?;
    let pipeline = Pipeline::from_config(&config);
    Ok(if no_backfill {
        pipeline.without_backfill()
    } else {
        pipeline
    })
}

fn open_writer(output: Option<&Path>) -> anyhow::Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(EXPORT_HEADER)?;
    Ok(writer)
}

fn write_record(writer: &mut csv::Writer<Box<dyn Write>>, record: &CanonicalRecord) -> anyhow::Result<()> {
    writer.serialize(record)?;
    Ok(())
}

fn run_parse(
    format: String,
    source_url: String,
    input: &Path,
    pipeline: &Pipeline,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let content = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let blob = RawBlob::new(content, format, source_url);
    let mut writer = open_writer(output)?;

    let mut stream = dispatch(blob, pipeline.table());
    for record in stream.by_ref() {
        write_record(&mut writer, &pipeline.finish_record(record))?;
    }
    writer.flush()?;

    let stats = stream.stats();
    eprintln!("\n📊 Results for {}:", stream.source_url());
    eprintln!("   Rows seen: {}", stats.rows_seen);
    eprintln!("   Emitted: {}", stats.emitted);
    eprintln!("   Filtered: {}", stats.filtered);
    eprintln!("   Skipped: {}", stats.skipped);

    let problems: Vec<_> = stream
        .diagnostics()
        .iter()
        .filter(|d| !matches!(d, osbb_scraper::Diagnostic::FilteredRecord { .. }))
        .collect();
    if !problems.is_empty() {
        warn!("{} diagnostics while parsing {}", problems.len(), stream.source_url());
        eprintln!("\n⚠️  Diagnostics:");
        for diagnostic in problems {
            eprintln!("   - {}", diagnostic);
        }
    }
    Ok(())
}

async fn run_batch(manifest: &Path, pipeline: &Pipeline, output: Option<&Path>) -> anyhow::Result<()> {
    let registry = DatasetRegistry::load(manifest).context("loading manifest")?;
    let (blobs, unreadable) = registry.read_blobs();

    let mut result = pipeline.run(blobs).await;
    result.blobs.extend(unreadable);

    let mut writer = open_writer(output)?;
    for record in result.records() {
        write_record(&mut writer, record)?;
    }
    writer.flush()?;

    eprintln!("\n📊 Batch results:");
    eprintln!("   Datasets: {}", result.blobs.len());
    eprintln!("   Records: {}", result.total_records());
    eprintln!("   Filtered: {}", result.total_filtered());

    let failed: Vec<_> = result.failed_blobs().collect();
    if !failed.is_empty() {
        warn!("{} datasets failed", failed.len());
        eprintln!("\n⚠️  Failed datasets:");
        for report in failed {
            for diagnostic in report.diagnostics.iter().filter(|d| d.is_blob_failure()) {
                eprintln!("   - {}", diagnostic);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    if let Err(e) = metrics::init_metrics() {
        warn!("Metrics disabled: {}", e);
    }

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Parse {
            format,
            source_url,
            input,
            config,
            output,
            no_backfill,
        } => {
            info!("Parsing {} as {}", input.display(), format);
            let pipeline = build_pipeline(config.as_deref(), no_backfill)?;
            run_parse(format, source_url, &input, &pipeline, output.as_deref())
        }
        Commands::Batch {
            manifest,
            config,
            output,
            no_backfill,
        } => {
            eprintln!("🚀 Running batch from {}...", manifest.display());
            let pipeline = build_pipeline(config.as_deref(), no_backfill)?;
            run_batch(&manifest, &pipeline, output.as_deref()).await
        }
    };

    match &outcome {
        Ok(()) => eprintln!("✅ Done"),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("❌ Run failed: {:#}", e);
        }
    }
    outcome
}
