//! Format-specific extraction and the per-blob record stream.
//!
//! Each [`Parser`] only turns bytes into [`SourceRow`]s. Resolution, address
//! assembly and validation happen once, in [`RecordStream`], so every format is
//! filtered by exactly the same rules.

pub mod csv;
pub mod json;
pub mod tabular;

use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::FILTERED_DIAGNOSTIC_LIMIT;
use crate::metrics::ParserMetrics;
use crate::pipeline::processing::normalize::{normalize_record, FieldMappingTable, FlatFieldMap};
use crate::pipeline::processing::quality_gate::RecordValidator;
use crate::types::{CanonicalRecord, DataFormat, RawBlob};

pub use self::csv::CsvParser;
pub use self::json::JsonParser;
pub use self::tabular::TabularParser;

/// Something the engine could not turn into a record. None of these are fatal:
/// they reduce the output of one blob, or of one row within it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("could not parse {source_url}: {reason}")]
    ParseFailure { source_url: String, reason: String },

    #[error("unsupported format '{format_tag}' for {source_url}")]
    UnsupportedFormat { source_url: String, format_tag: String },

    #[error("no record list at the root or under data/records/features in {source_url}")]
    StructureNotFound { source_url: String },

    #[error("record list in {source_url} is empty")]
    EmptyDataset { source_url: String },

    #[error("entry {index} in {source_url} is not an object")]
    NonMappingEntry { source_url: String, index: usize },

    #[error("row {row} in {source_url} could not be read: {reason}")]
    MalformedRow { source_url: String, row: usize, reason: String },

    #[error("row {row} in {source_url} has neither EDRPOU nor address")]
    FilteredRecord { source_url: String, row: usize },
}

/// Discriminant of a [`Diagnostic`], handy for counting and matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    ParseFailure,
    UnsupportedFormat,
    StructureNotFound,
    EmptyDataset,
    NonMappingEntry,
    MalformedRow,
    FilteredRecord,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailure => "parse_failure",
            Self::UnsupportedFormat => "unsupported_format",
            Self::StructureNotFound => "structure_not_found",
            Self::EmptyDataset => "empty_dataset",
            Self::NonMappingEntry => "non_mapping_entry",
            Self::MalformedRow => "malformed_row",
            Self::FilteredRecord => "filtered_record",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Diagnostic {
    pub fn parse_failure(source_url: &str, reason: impl fmt::Display) -> Self {
        Self::ParseFailure {
            source_url: source_url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::ParseFailure { .. } => DiagnosticKind::ParseFailure,
            Self::UnsupportedFormat { .. } => DiagnosticKind::UnsupportedFormat,
            Self::StructureNotFound { .. } => DiagnosticKind::StructureNotFound,
            Self::EmptyDataset { .. } => DiagnosticKind::EmptyDataset,
            Self::NonMappingEntry { .. } => DiagnosticKind::NonMappingEntry,
            Self::MalformedRow { .. } => DiagnosticKind::MalformedRow,
            Self::FilteredRecord { .. } => DiagnosticKind::FilteredRecord,
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            Self::ParseFailure { source_url, .. }
            | Self::UnsupportedFormat { source_url, .. }
            | Self::StructureNotFound { source_url }
            | Self::EmptyDataset { source_url }
            | Self::NonMappingEntry { source_url, .. }
            | Self::MalformedRow { source_url, .. }
            | Self::FilteredRecord { source_url, .. } => source_url,
        }
    }

    /// True when the whole blob yielded nothing because of this diagnostic
    pub fn is_blob_failure(&self) -> bool {
        matches!(
            self.kind(),
            DiagnosticKind::ParseFailure
                | DiagnosticKind::UnsupportedFormat
                | DiagnosticKind::StructureNotFound
                | DiagnosticKind::EmptyDataset
        )
    }
}

/// One row or entry of a source, flattened and tagged with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// Zero-based position among the source's data rows/entries
    pub index: usize,
    pub fields: FlatFieldMap,
}

pub type RowResult = std::result::Result<SourceRow, Diagnostic>;

/// Lazily produced rows of one blob
pub type Rows = Box<dyn Iterator<Item = RowResult> + Send>;

/// Turns the bytes of one blob into rows.
///
/// Blob-level failures are returned as the `Err` diagnostic; row-level failures
/// travel inside the iterator so sibling rows keep flowing.
pub trait Parser: Send + Sync {
    fn name(&self) -> &'static str;

    fn rows(&self, content: Vec<u8>, source_url: &str) -> std::result::Result<Rows, Diagnostic>;
}

/// Pick the parser for a declared format
pub fn parser_for(format: DataFormat) -> Box<dyn Parser> {
    match format {
        DataFormat::Csv => Box::new(CsvParser::new()),
        DataFormat::Json | DataFormat::Api => Box::new(JsonParser::new()),
        DataFormat::Xls | DataFormat::Xlsx => Box::new(TabularParser::new()),
    }
}

/// Route a blob to its parser and return the lazy record stream.
///
/// Never fails: an unknown format tag or unreadable content produces an empty
/// stream whose diagnostics explain why.
pub fn dispatch(blob: RawBlob, table: &FieldMappingTable) -> RecordStream<'_> {
    let RawBlob {
        content,
        format_tag,
        source_url,
    } = blob;

    let format = match DataFormat::from_tag(&format_tag) {
        Some(format) => format,
        None => {
            let diagnostic = Diagnostic::UnsupportedFormat {
                source_url: source_url.clone(),
                format_tag,
            };
            return RecordStream::failed(source_url, None, table, diagnostic);
        }
    };

    let parser = parser_for(format);
    ParserMetrics::record_blob_started(format);
    info!(
        "dispatch: format={} parser={} bytes={} source_url={}",
        format,
        parser.name(),
        content.len(),
        source_url
    );

    match parser.rows(content, &source_url) {
        Ok(rows) => RecordStream::new(source_url, format, table, rows),
        Err(diagnostic) => RecordStream::failed(source_url, Some(format), table, diagnostic),
    }
}

/// Row accounting for one blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub rows_seen: usize,
    pub emitted: usize,
    pub filtered: usize,
    pub skipped: usize,
}

/// Lazy, finite, single-pass sequence of canonical records for one blob.
///
/// Records are resolved and validated as they are pulled; nothing is buffered.
/// Diagnostics accumulate on the stream and can be inspected at any point. Only
/// the first `FILTERED_DIAGNOSTIC_LIMIT` filtered rows are kept as diagnostics;
/// `stats().filtered` always holds the full count.
pub struct RecordStream<'a> {
    source_url: String,
    format: Option<DataFormat>,
    table: &'a FieldMappingTable,
    validator: RecordValidator,
    rows: Rows,
    diagnostics: Vec<Diagnostic>,
    stats: ParseStats,
    finished: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(
        source_url: String,
        format: DataFormat,
        table: &'a FieldMappingTable,
        rows: Rows,
    ) -> Self {
        Self {
            source_url,
            format: Some(format),
            table,
            validator: RecordValidator::new(),
            rows,
            diagnostics: Vec::new(),
            stats: ParseStats::default(),
            finished: false,
        }
    }

    /// A stream that yields nothing, carrying the blob-level diagnostic
    pub fn failed(
        source_url: String,
        format: Option<DataFormat>,
        table: &'a FieldMappingTable,
        diagnostic: Diagnostic,
    ) -> Self {
        let mut stream = Self {
            source_url,
            format,
            table,
            validator: RecordValidator::new(),
            rows: Box::new(std::iter::empty()),
            diagnostics: Vec::new(),
            stats: ParseStats::default(),
            finished: true,
        };
        stream.report(diagnostic);
        stream
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn format(&self) -> Option<DataFormat> {
        self.format
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Drain the stream, keeping records and diagnostics together
    pub fn into_outcome(mut self) -> ParseOutcome {
        let records: Vec<CanonicalRecord> = self.by_ref().collect();
        ParseOutcome {
            source_url: self.source_url,
            records,
            diagnostics: self.diagnostics,
            stats: self.stats,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind() {
            DiagnosticKind::FilteredRecord => {
                debug!("{}", diagnostic);
                if let Some(format) = self.format {
                    ParserMetrics::record_filtered(format);
                }
                // Past the limit filtered rows are only counted in `stats`
                if self.stats.filtered > FILTERED_DIAGNOSTIC_LIMIT {
                    return;
                }
            }
            DiagnosticKind::NonMappingEntry | DiagnosticKind::MalformedRow => {
                warn!("{}", diagnostic);
                if let Some(format) = self.format {
                    ParserMetrics::record_skipped(format);
                }
            }
            kind => {
                warn!("{}", diagnostic);
                ParserMetrics::record_blob_failed(kind.as_str());
            }
        }
        self.diagnostics.push(diagnostic);
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        info!(
            "RecordStream finished: source_url={} rows={} emitted={} filtered={} skipped={}",
            self.source_url,
            self.stats.rows_seen,
            self.stats.emitted,
            self.stats.filtered,
            self.stats.skipped
        );
    }
}

impl Iterator for RecordStream<'_> {
    type Item = CanonicalRecord;

    fn next(&mut self) -> Option<CanonicalRecord> {
        while let Some(row) = self.rows.next() {
            self.stats.rows_seen += 1;
            match row {
                Ok(row) => {
                    let record = normalize_record(&row.fields, self.table, &self.source_url);
                    if self.validator.accept(&record) {
                        self.stats.emitted += 1;
                        if let Some(format) = self.format {
                            ParserMetrics::record_emitted(format);
                        }
                        return Some(record);
                    }
                    self.stats.filtered += 1;
                    let diagnostic = Diagnostic::FilteredRecord {
                        source_url: self.source_url.clone(),
                        row: row.index,
                    };
                    self.report(diagnostic);
                }
                Err(diagnostic) => {
                    self.stats.skipped += 1;
                    self.report(diagnostic);
                }
            }
        }
        self.finish();
        None
    }
}

/// A fully drained stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub source_url: String,
    pub records: Vec<CanonicalRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ParseStats,
}

impl ParseOutcome {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_yields_nothing() {
        let table = FieldMappingTable::default();
        let blob = RawBlob::new(b"whatever".to_vec(), "PDF", "https://portal/ds/1");
        let outcome = dispatch(blob, &table).into_outcome();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0],
            Diagnostic::UnsupportedFormat {
                source_url: "https://portal/ds/1".to_string(),
                format_tag: "PDF".to_string(),
            }
        );
        assert!(outcome.diagnostics[0].is_blob_failure());
    }

    #[test]
    fn test_format_tag_routing_is_case_insensitive() {
        let table = FieldMappingTable::default();
        for tag in ["json", "Api", "JSON"] {
            let blob = RawBlob::new(br#"[{"EDRPOU": "1"}]"#.to_vec(), tag, "u");
            let stream = dispatch(blob, &table);
            assert_eq!(stream.format().map(|f| parser_for(f).name()), Some("JsonParser"));
            assert_eq!(stream.count(), 1);
        }
        let blob = RawBlob::new(b"EDRPOU\n1\n".to_vec(), "csv", "u");
        assert_eq!(dispatch(blob, &table).count(), 1);
    }

    #[test]
    fn test_stream_is_lazy_and_counts() {
        let table = FieldMappingTable::default();
        let blob = RawBlob::new(
            r#"[{"EDRPOU": "1"}, {"Назва": "no id"}, 7, {"ADDR": "вул. Миру 2"}]"#
                .as_bytes()
                .to_vec(),
            "JSON",
            "https://portal/ds/2",
        );
        let mut stream = dispatch(blob, &table);
        let first = stream.next().unwrap();
        assert_eq!(first.edrpou, "1");
        // Nothing past the first accepted row has been looked at yet
        assert_eq!(stream.stats().rows_seen, 1);
        assert!(stream.diagnostics().is_empty());

        let second = stream.next().unwrap();
        assert_eq!(second.address, "вул. Миру 2");
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());

        assert_eq!(
            stream.stats(),
            ParseStats { rows_seen: 4, emitted: 2, filtered: 1, skipped: 1 }
        );
        let kinds: Vec<DiagnosticKind> = stream.diagnostics().iter().map(Diagnostic::kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::FilteredRecord, DiagnosticKind::NonMappingEntry]);
    }

    #[test]
    fn test_filtered_diagnostics_are_capped() {
        let table = FieldMappingTable::default();
        let total = FILTERED_DIAGNOSTIC_LIMIT + 50;
        let mut csv = String::from("Назва,EDRPOU\n");
        for i in 0..total {
            csv.push_str(&format!("ОСББ {},\n", i));
        }
        csv.push_str("ОСББ last,12345678\n");
        let blob = RawBlob::new(csv, "CSV", "https://portal/ds/3");

        let outcome = dispatch(blob, &table).into_outcome();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.stats.filtered, total);
        assert_eq!(outcome.count(DiagnosticKind::FilteredRecord), FILTERED_DIAGNOSTIC_LIMIT);
        assert_eq!(
            outcome.diagnostics[0],
            Diagnostic::FilteredRecord { source_url: "https://portal/ds/3".to_string(), row: 0 }
        );
    }

    #[test]
    fn test_diagnostic_messages_name_the_source() {
        let d = Diagnostic::FilteredRecord { source_url: "https://x/y".to_string(), row: 3 };
        assert_eq!(d.source_url(), "https://x/y");
        assert!(d.to_string().contains("https://x/y"));
        assert!(!d.is_blob_failure());
    }
}
