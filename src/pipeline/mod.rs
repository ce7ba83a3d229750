// Blob processing pipeline: dispatch, normalize, validate, backfill

pub mod processing;

pub use processing::parser::{dispatch, Diagnostic, DiagnosticKind, ParseOutcome, ParseStats, RecordStream};

use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::pipeline::processing::enrich::CityBackfill;
use crate::pipeline::processing::normalize::FieldMappingTable;
use crate::types::{CanonicalRecord, RawBlob};

/// What one blob produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReport {
    pub source_url: String,
    pub format_tag: String,
    pub records: Vec<CanonicalRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ParseStats,
}

impl BlobReport {
    /// A blob that never reached a parser (e.g. its file could not be read)
    pub fn failed(source_url: String, format_tag: String, diagnostic: Diagnostic) -> Self {
        Self {
            source_url,
            format_tag,
            records: Vec::new(),
            diagnostics: vec![diagnostic],
            stats: ParseStats::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_blob_failure)
    }
}

/// Result of a complete pipeline run, one report per input blob in input order
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub blobs: Vec<BlobReport>,
}

impl PipelineResult {
    pub fn records(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.blobs.iter().flat_map(|b| b.records.iter())
    }

    pub fn total_records(&self) -> usize {
        self.blobs.iter().map(|b| b.records.len()).sum()
    }

    pub fn total_filtered(&self) -> usize {
        self.blobs.iter().map(|b| b.stats.filtered).sum()
    }

    pub fn failed_blobs(&self) -> impl Iterator<Item = &BlobReport> {
        self.blobs.iter().filter(|b| b.is_failed())
    }
}

/// Normalizes blobs with a shared, read-only alias table and optional city backfill.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone)]
pub struct Pipeline {
    table: Arc<FieldMappingTable>,
    backfill: Option<Arc<CityBackfill>>,
}

impl Pipeline {
    pub fn new(table: Arc<FieldMappingTable>) -> Self {
        Self {
            table,
            backfill: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(config.field_mappings())).with_backfill(config.city_backfill())
    }

    pub fn with_backfill(mut self, backfill: CityBackfill) -> Self {
        self.backfill = Some(Arc::new(backfill));
        self
    }

    pub fn without_backfill(mut self) -> Self {
        self.backfill = None;
        self
    }

    pub fn table(&self) -> &FieldMappingTable {
        &self.table
    }

    /// Apply post-processing to a record that passed validation
    pub fn finish_record(&self, record: CanonicalRecord) -> CanonicalRecord {
        match &self.backfill {
            Some(backfill) => backfill.enrich(record),
            None => record,
        }
    }

    /// Process one blob to completion
    #[instrument(skip(self, blob), fields(source_url = %blob.source_url, format = %blob.format_tag))]
    pub fn process_blob(&self, blob: RawBlob) -> BlobReport {
        let format_tag = blob.format_tag.clone();
        let mut stream = dispatch(blob, &self.table);
        let records: Vec<CanonicalRecord> = stream
            .by_ref()
            .map(|record| self.finish_record(record))
            .collect();

        BlobReport {
            source_url: stream.source_url().to_string(),
            format_tag,
            records,
            diagnostics: stream.diagnostics().to_vec(),
            stats: stream.stats(),
        }
    }

    /// Process many blobs concurrently. Each blob is its own failure domain:
    /// nothing that happens while parsing one blob affects another.
    pub async fn run(&self, blobs: Vec<RawBlob>) -> PipelineResult {
        info!("Pipeline: starting run blobs={}", blobs.len());

        let handles: Vec<_> = blobs
            .into_iter()
            .map(|blob| {
                let source_url = blob.source_url.clone();
                let format_tag = blob.format_tag.clone();
                let pipeline = self.clone();
                let handle = tokio::task::spawn_blocking(move || pipeline.process_blob(blob));
                (source_url, format_tag, handle)
            })
            .collect();

        let mut result = PipelineResult::default();
        for (source_url, format_tag, handle) in handles {
            match handle.await {
                Ok(report) => result.blobs.push(report),
                Err(e) => {
                    error!("Pipeline: worker for {} failed: {}", source_url, e);
                    let diagnostic =
                        Diagnostic::parse_failure(&source_url, format!("worker task failed: {}", e));
                    result
                        .blobs
                        .push(BlobReport::failed(source_url, format_tag, diagnostic));
                }
            }
        }

        info!(
            "Pipeline: finished blobs={} records={} filtered={} failed_blobs={}",
            result.blobs.len(),
            result.total_records(),
            result.total_filtered(),
            result.failed_blobs().count()
        );
        result
    }
}
